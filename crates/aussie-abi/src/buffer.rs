use crate::abi::{RawPtr, RuntimeAbi};
use crate::error::{AbiError, Result};

/// A runtime-owned buffer released on every exit path.
///
/// Covers the three marshaling shapes the ABI needs: copying source text in
/// (`copy_in`/`copy_in_terminated`), caller-allocated out-slots (`zeroed`),
/// and adopting a buffer the runtime allocated for us (`adopt`). Ownership
/// can be handed to an entry point that frees its own argument with
/// [`ScopedBuffer::into_raw`].
pub struct ScopedBuffer<'rt> {
    rt: &'rt dyn RuntimeAbi,
    ptr: Option<RawPtr>,
    len: usize,
}

impl<'rt> ScopedBuffer<'rt> {
    /// Allocate a buffer of exactly `bytes.len()` and copy `bytes` in.
    pub fn copy_in(rt: &'rt dyn RuntimeAbi, bytes: &[u8]) -> Result<Self> {
        let buf = Self::alloc(rt, bytes.len())?;
        rt.write_bytes(buf.ptr(), bytes)?;
        Ok(buf)
    }

    /// Allocate `bytes.len() + 1` and copy `bytes` in followed by a NUL
    /// terminator, the framing the interpret and flip entry points expect
    /// for source text.
    pub fn copy_in_terminated(rt: &'rt dyn RuntimeAbi, bytes: &[u8]) -> Result<Self> {
        let mut terminated = Vec::with_capacity(bytes.len() + 1);
        terminated.extend_from_slice(bytes);
        terminated.push(0);
        Self::copy_in(rt, &terminated)
    }

    /// Allocate a zero-filled buffer of `len` bytes.
    pub fn zeroed(rt: &'rt dyn RuntimeAbi, len: usize) -> Result<Self> {
        let buf = Self::alloc(rt, len)?;
        rt.write_bytes(buf.ptr(), &vec![0u8; len])?;
        Ok(buf)
    }

    /// Take ownership of a buffer the runtime allocated, so it is released
    /// once read.
    pub fn adopt(rt: &'rt dyn RuntimeAbi, ptr: RawPtr, len: usize) -> Self {
        Self {
            rt,
            ptr: Some(ptr),
            len,
        }
    }

    fn alloc(rt: &'rt dyn RuntimeAbi, len: usize) -> Result<Self> {
        let ptr = rt.alloc(len)?;
        Ok(Self {
            rt,
            ptr: Some(ptr),
            len,
        })
    }

    pub fn ptr(&self) -> RawPtr {
        // Only `into_raw` clears the pointer, and it consumes self.
        self.ptr.unwrap_or(RawPtr::NULL)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the whole buffer back out of runtime memory.
    pub fn read(&self) -> Result<Vec<u8>> {
        self.rt.read_bytes(self.ptr(), self.len)
    }

    /// Decode a 4-byte little-endian length slot.
    pub fn read_u32_le(&self) -> Result<u32> {
        let bytes = self.read()?;
        let bytes: [u8; 4] = bytes.try_into().map_err(|_| AbiError::LengthSlot {
            expected: 4,
            len: self.len,
        })?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Transfer ownership to an entry point that frees its own argument.
    pub fn into_raw(mut self) -> RawPtr {
        self.ptr.take().unwrap_or(RawPtr::NULL)
    }
}

impl Drop for ScopedBuffer<'_> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            if let Err(error) = self.rt.dealloc(ptr, self.len) {
                tracing::warn!(%ptr, len = self.len, %error, "failed to release runtime buffer");
            }
        }
    }
}
