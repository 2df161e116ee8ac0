use std::path::PathBuf;

use thiserror::Error;

use crate::abi::RawPtr;

pub type Result<T> = std::result::Result<T, AbiError>;

#[derive(Debug, Error)]
pub enum AbiError {
    #[error("failed to load runtime library {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("runtime library is missing symbol `{name}`: {source}")]
    MissingSymbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("runtime allocation of {len} bytes failed")]
    AllocFailed { len: usize },
    #[error("pointer {ptr} with length {len} is not a live runtime buffer")]
    BadPointer { ptr: RawPtr, len: usize },
    #[error("length slot must be {expected} bytes, got {len}")]
    LengthSlot { expected: usize, len: usize },
    #[error("interpret entry point returned status {status}")]
    Interpret { status: i32 },
    #[error("flip entry point returned a null output buffer")]
    NullOutput,
}
