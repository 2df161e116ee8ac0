//! Isolated execution boundary for the Aussie++ runtime.
//!
//! The compiled runtime runs on a dedicated worker thread so arbitrary user
//! code can never block or corrupt the host. The host talks to it only
//! through [`ExecutionBoundary`]: async `initialize`/`run`/`flip` calls with
//! at most one in flight, plus a broadcast stream of stdout/stderr events
//! consumed through [`OutputSubscription`].

pub mod error;

mod boundary;
mod dispatch;
mod marshal;
mod subscription;
mod worker;

pub use aussie_proto::OutputEvent;
pub use boundary::ExecutionBoundary;
pub use error::{BoundaryError, Result};
pub use subscription::OutputSubscription;
