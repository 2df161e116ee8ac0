//! Buffer marshaling across the runtime ABI.
//!
//! Source text crosses as a NUL-terminated buffer the entry point consumes;
//! flip results come back as a runtime-allocated buffer plus a 4-byte
//! little-endian length slot. Every buffer the host allocates or adopts is
//! held in a [`ScopedBuffer`] so it is released on all exit paths.

use aussie_abi::{RuntimeAbi, ScopedBuffer};

use crate::error::Result;

const LEN_SLOT_BYTES: usize = 4;

pub(crate) fn interpret(rt: &dyn RuntimeAbi, source: &str, upside_down: bool) -> Result<()> {
    let source = ScopedBuffer::copy_in_terminated(rt, source.as_bytes())?;
    // The entry point takes ownership of the buffer and frees it.
    rt.interpret(source.into_raw(), upside_down)?;
    Ok(())
}

pub(crate) fn flip(rt: &dyn RuntimeAbi, source: &str, upside_down: bool) -> Result<String> {
    let len_slot = ScopedBuffer::zeroed(rt, LEN_SLOT_BYTES)?;
    let source = ScopedBuffer::copy_in_terminated(rt, source.as_bytes())?;

    // Like interpret, flip_text consumes its source buffer; the length slot
    // and the returned buffer are ours to release.
    let out_ptr = rt.flip_text(source.into_raw(), len_slot.ptr(), upside_down)?;
    let out_len = len_slot.read_u32_le()? as usize;

    let output = ScopedBuffer::adopt(rt, out_ptr, out_len);
    let bytes = output.read()?;
    Ok(String::from_utf8(bytes)?)
}
