use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Address of a buffer inside runtime-owned memory.
///
/// The runtime's heap is opaque to the host; a `RawPtr` is only meaningful
/// when handed back to the same [`RuntimeAbi`] instance that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawPtr(pub usize);

impl RawPtr {
    pub const NULL: RawPtr = RawPtr(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RawPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Receiver for the runtime's `print`/`printErr` callbacks.
///
/// Installed when a runtime is instantiated; the runtime may call it at any
/// point while an entry point is executing, from the thread that made the
/// call.
pub trait OutputSink: Send + Sync {
    fn stdout(&self, text: &str);
    fn stderr(&self, text: &str);
}

/// The entry points the playground actually uses, and nothing else.
///
/// `interpret` and `flip_text` take ownership of the source buffer passed to
/// them and release it before returning. `flip_text` writes the output
/// length into a caller-allocated 4-byte little-endian slot and returns a
/// newly allocated buffer the caller must release.
pub trait RuntimeAbi {
    fn alloc(&self, len: usize) -> Result<RawPtr>;

    fn dealloc(&self, ptr: RawPtr, len: usize) -> Result<()>;

    /// Copy `bytes` into the buffer at `ptr`, starting at offset zero.
    fn write_bytes(&self, ptr: RawPtr, bytes: &[u8]) -> Result<()>;

    /// Read `len` bytes from the buffer at `ptr`.
    fn read_bytes(&self, ptr: RawPtr, len: usize) -> Result<Vec<u8>>;

    fn interpret(&self, source: RawPtr, upside_down: bool) -> Result<()>;

    fn flip_text(&self, source: RawPtr, len_slot: RawPtr, upside_down: bool) -> Result<RawPtr>;
}

/// Produces a runtime instance inside the isolated execution context.
///
/// Called on the worker thread so the instance never has to cross threads.
/// Callable more than once: a failed initialization may be retried.
pub type RuntimeFactory =
    Box<dyn Fn(Arc<dyn OutputSink>) -> Result<Box<dyn RuntimeAbi>> + Send + 'static>;
