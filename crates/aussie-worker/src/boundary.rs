use std::sync::mpsc;
use std::sync::{Mutex, MutexGuard, PoisonError};

use aussie_abi::{RuntimeConfig, RuntimeFactory};
use aussie_proto::{BoundaryRequest, BoundaryResponse, OutputEvent};
use tokio::sync::{broadcast, oneshot};

use crate::error::{BoundaryError, Result};
use crate::subscription::OutputSubscription;
use crate::worker::{self, EVENT_CHANNEL_CAPACITY, WorkerCmd};

/// Lifecycle of a boundary instance. `Busy` is entered on `run`/`flip` and
/// left on resolution or rejection; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Initializing,
    Ready,
    Busy,
}

/// Host-side handle to the isolated execution context.
///
/// Construct once per session, await [`initialize`](Self::initialize), then
/// issue at most one `run`/`flip` at a time; a second call while one is
/// outstanding is rejected with [`BoundaryError::Busy`]. Output events are
/// consumed through [`subscribe`](Self::subscribe). Dropping the handle
/// asks the context to stop once it is idle.
pub struct ExecutionBoundary {
    cmd_tx: mpsc::Sender<WorkerCmd>,
    events: broadcast::Sender<OutputEvent>,
    phase: Mutex<Phase>,
}

impl ExecutionBoundary {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_factory(config.into_factory())
    }

    /// Construct over an explicit runtime factory. The factory runs inside
    /// the execution context when `initialize` is called.
    pub fn with_factory(factory: RuntimeFactory) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cmd_tx = worker::spawn(factory, events.clone());
        Self {
            cmd_tx,
            events,
            phase: Mutex::new(Phase::Uninitialized),
        }
    }

    /// Subscribe to the output streams. May be called before `initialize`;
    /// each subscriber sees every event from the moment it subscribes.
    pub fn subscribe(&self) -> OutputSubscription {
        OutputSubscription::new(self.events.subscribe())
    }

    pub fn is_busy(&self) -> bool {
        *lock(&self.phase) == Phase::Busy
    }

    /// Load and instantiate the runtime. Idempotent: resolves immediately
    /// once the boundary is ready. Must resolve before `run`/`flip`.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut phase = lock(&self.phase);
            match *phase {
                // Busy implies initialized; idempotent either way.
                Phase::Ready | Phase::Busy => return Ok(()),
                Phase::Initializing => return Err(BoundaryError::Initializing),
                Phase::Uninitialized => *phase = Phase::Initializing,
            }
        }

        match self.request(BoundaryRequest::Initialize).await {
            Ok(BoundaryResponse::Ready) => {
                self.set_phase(Phase::Ready);
                Ok(())
            }
            Ok(BoundaryResponse::Error { message }) => {
                self.set_phase(Phase::Uninitialized);
                Err(BoundaryError::InitFailed(message))
            }
            Ok(other) => {
                self.set_phase(Phase::Uninitialized);
                Err(unexpected(&other))
            }
            Err(error) => {
                self.set_phase(Phase::Uninitialized);
                Err(error)
            }
        }
    }

    /// Hand the program to the interpreter. Resolves once the interpret
    /// entry point returns, however many output events it emitted along the
    /// way; the events themselves arrive on the subscription.
    pub async fn run(&self, source: impl Into<String>, upside_down: bool) -> Result<()> {
        self.enter_busy()?;
        let result = self
            .request(BoundaryRequest::Run {
                source: source.into(),
                upside_down,
            })
            .await;
        self.set_phase(Phase::Ready);

        match result? {
            BoundaryResponse::RunFinished => Ok(()),
            BoundaryResponse::Error { message } => Err(BoundaryError::Execution(message)),
            other => Err(unexpected(&other)),
        }
    }

    /// Transform the program text, resolving with the flipped form.
    pub async fn flip(&self, source: impl Into<String>, upside_down: bool) -> Result<String> {
        self.enter_busy()?;
        let result = self
            .request(BoundaryRequest::Flip {
                source: source.into(),
                upside_down,
            })
            .await;
        self.set_phase(Phase::Ready);

        match result? {
            BoundaryResponse::FlippedText { text } => Ok(text),
            BoundaryResponse::Error { message } => Err(BoundaryError::Execution(message)),
            other => Err(unexpected(&other)),
        }
    }

    fn enter_busy(&self) -> Result<()> {
        let mut phase = lock(&self.phase);
        match *phase {
            Phase::Ready => {
                *phase = Phase::Busy;
                Ok(())
            }
            Phase::Busy => Err(BoundaryError::Busy),
            Phase::Uninitialized | Phase::Initializing => Err(BoundaryError::NotReady),
        }
    }

    fn set_phase(&self, phase: Phase) {
        *lock(&self.phase) = phase;
    }

    async fn request(&self, request: BoundaryRequest) -> Result<BoundaryResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(WorkerCmd::Request {
                request,
                reply: reply_tx,
            })
            .map_err(|_| BoundaryError::ContextGone)?;
        reply_rx.await.map_err(|_| BoundaryError::ContextGone)
    }
}

impl Drop for ExecutionBoundary {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(WorkerCmd::Shutdown);
    }
}

fn unexpected(response: &BoundaryResponse) -> BoundaryError {
    BoundaryError::Protocol(format!("{response:?}"))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
