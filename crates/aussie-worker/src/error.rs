use aussie_abi::AbiError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoundaryError>;

#[derive(Debug, Error)]
pub enum BoundaryError {
    /// `run`/`flip` was called before `initialize` resolved.
    #[error("execution boundary is not ready")]
    NotReady,
    /// A second `initialize` arrived while the first was in flight.
    #[error("initialization is already in flight")]
    Initializing,
    /// A `run`/`flip` is already outstanding on this boundary.
    #[error("a call is already in flight")]
    Busy,
    #[error("runtime initialization failed: {0}")]
    InitFailed(String),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error("program output is not valid UTF-8: {0}")]
    OutputEncoding(#[from] std::string::FromUtf8Error),
    /// The worker thread is gone; nothing on this boundary will succeed.
    #[error("execution context is gone")]
    ContextGone,
    #[error("unexpected response from execution context: {0}")]
    Protocol(String),
}
