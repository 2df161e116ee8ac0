use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use aussie_abi::{OutputSink, RuntimeFactory};
use aussie_proto::{BoundaryRequest, BoundaryResponse, OutputEvent};
use tokio::sync::{broadcast, oneshot};

use crate::dispatch::ContextState;

pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

pub(crate) enum WorkerCmd {
    Request {
        request: BoundaryRequest,
        reply: oneshot::Sender<BoundaryResponse>,
    },
    Shutdown,
}

/// Forwards runtime callbacks into the event stream. A send error means no
/// subscriber is listening; events are fire-and-forget.
struct ChannelSink {
    events: broadcast::Sender<OutputEvent>,
}

impl OutputSink for ChannelSink {
    fn stdout(&self, text: &str) {
        let _ = self.events.send(OutputEvent::stdout(text));
    }

    fn stderr(&self, text: &str) {
        let _ = self.events.send(OutputEvent::stderr(text));
    }
}

/// Spawn the isolated execution context.
///
/// The thread owns the runtime instance for its whole life and services
/// requests strictly one at a time; a non-terminating runtime call pins it
/// forever, which the boundary surfaces as a permanently busy state.
pub(crate) fn spawn(
    factory: RuntimeFactory,
    events: broadcast::Sender<OutputEvent>,
) -> mpsc::Sender<WorkerCmd> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<WorkerCmd>();

    let spawned = thread::Builder::new()
        .name("aussie-runtime".to_owned())
        .spawn(move || {
            let sink = Arc::new(ChannelSink { events });
            let mut state = ContextState::new(factory, sink);
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    WorkerCmd::Request { request, reply } => {
                        let response = state.dispatch(request);
                        // The host may have stopped waiting; nothing to do.
                        let _ = reply.send(response);
                    }
                    WorkerCmd::Shutdown => break,
                }
            }
            tracing::debug!("execution context stopped");
        });

    if let Err(error) = spawned {
        // Requests will fail with ContextGone once the receiver is dropped.
        tracing::error!(%error, "failed to spawn execution context thread");
    }

    cmd_tx
}
