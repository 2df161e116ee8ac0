use aussie_proto::OutputEvent;
use tokio::sync::broadcast;

/// Receiver half of the boundary's output stream.
///
/// Events within each stream arrive in emission order. A subscriber that
/// falls too far behind loses the oldest events and is told so via a
/// warning rather than an error.
pub struct OutputSubscription {
    rx: broadcast::Receiver<OutputEvent>,
}

impl OutputSubscription {
    pub(crate) fn new(rx: broadcast::Receiver<OutputEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the boundary is gone.
    pub async fn recv(&mut self) -> Option<OutputEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "output subscriber lagged, events were dropped");
                }
            }
        }
    }

    /// Drain an event that has already been delivered, without waiting.
    pub fn try_recv(&mut self) -> Option<OutputEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "output subscriber lagged, events were dropped");
                }
                Err(_) => return None,
            }
        }
    }
}
