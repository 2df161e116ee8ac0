//! Shared-library form of the runtime.
//!
//! The compiled artifact exposes the unmangled entry points `alloc`,
//! `dealloc`, `interpret` and `flip_text`, plus `set_output` through which
//! the loader installs the stdout/stderr callbacks the interpreter prints
//! through. Pointers returned by the library are addresses in its own
//! allocator; they are never dereferenced outside this module.

use std::ffi::c_void;
use std::path::Path;
use std::sync::Arc;

use libloading::Library;

use crate::abi::{OutputSink, RawPtr, RuntimeAbi};
use crate::error::{AbiError, Result};

type AllocFn = unsafe extern "C" fn(usize) -> *mut u8;
type DeallocFn = unsafe extern "C" fn(*mut u8, usize);
type InterpretFn = unsafe extern "C" fn(*mut u8, bool) -> i32;
type FlipTextFn = unsafe extern "C" fn(*mut u8, *mut u8, bool) -> *mut u8;
type OutputCallback = unsafe extern "C" fn(*mut c_void, *const u8, usize);
type SetOutputFn = unsafe extern "C" fn(*mut c_void, OutputCallback, OutputCallback);

struct SinkCtx {
    sink: Arc<dyn OutputSink>,
}

unsafe extern "C" fn stdout_trampoline(ctx: *mut c_void, ptr: *const u8, len: usize) {
    // ctx is the Box<SinkCtx> installed in `load`; the library passes it
    // back verbatim on every callback.
    let ctx = unsafe { &*ctx.cast::<SinkCtx>() };
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
    ctx.sink.stdout(&String::from_utf8_lossy(bytes));
}

unsafe extern "C" fn stderr_trampoline(ctx: *mut c_void, ptr: *const u8, len: usize) {
    let ctx = unsafe { &*ctx.cast::<SinkCtx>() };
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
    ctx.sink.stderr(&String::from_utf8_lossy(bytes));
}

/// A runtime instance backed by a loaded shared library.
pub struct DylibRuntime {
    alloc: AllocFn,
    dealloc: DeallocFn,
    interpret: InterpretFn,
    flip_text: FlipTextFn,
    // Freed in Drop, before the library is unloaded (field order).
    sink_ctx: *mut SinkCtx,
    _lib: Library,
}

impl DylibRuntime {
    pub fn load(path: &Path, sink: Arc<dyn OutputSink>) -> Result<Self> {
        let lib = unsafe { Library::new(path) }.map_err(|source| AbiError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let alloc = *resolve::<AllocFn>(&lib, "alloc")?;
        let dealloc = *resolve::<DeallocFn>(&lib, "dealloc")?;
        let interpret = *resolve::<InterpretFn>(&lib, "interpret")?;
        let flip_text = *resolve::<FlipTextFn>(&lib, "flip_text")?;
        let set_output = *resolve::<SetOutputFn>(&lib, "set_output")?;

        let sink_ctx = Box::into_raw(Box::new(SinkCtx { sink }));
        unsafe { set_output(sink_ctx.cast(), stdout_trampoline, stderr_trampoline) };

        Ok(Self {
            alloc,
            dealloc,
            interpret,
            flip_text,
            sink_ctx,
            _lib: lib,
        })
    }
}

fn resolve<'lib, T>(lib: &'lib Library, name: &'static str) -> Result<libloading::Symbol<'lib, T>> {
    unsafe { lib.get::<T>(name.as_bytes()) }
        .map_err(|source| AbiError::MissingSymbol { name, source })
}

impl RuntimeAbi for DylibRuntime {
    fn alloc(&self, len: usize) -> Result<RawPtr> {
        let ptr = unsafe { (self.alloc)(len) };
        if ptr.is_null() {
            return Err(AbiError::AllocFailed { len });
        }
        Ok(RawPtr(ptr as usize))
    }

    fn dealloc(&self, ptr: RawPtr, len: usize) -> Result<()> {
        if ptr.is_null() {
            return Err(AbiError::BadPointer { ptr, len });
        }
        unsafe { (self.dealloc)(ptr.0 as *mut u8, len) };
        Ok(())
    }

    fn write_bytes(&self, ptr: RawPtr, bytes: &[u8]) -> Result<()> {
        if ptr.is_null() {
            return Err(AbiError::BadPointer {
                ptr,
                len: bytes.len(),
            });
        }
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.0 as *mut u8, bytes.len()) };
        Ok(())
    }

    fn read_bytes(&self, ptr: RawPtr, len: usize) -> Result<Vec<u8>> {
        if ptr.is_null() {
            return Err(AbiError::BadPointer { ptr, len });
        }
        let bytes = unsafe { std::slice::from_raw_parts(ptr.0 as *const u8, len) };
        Ok(bytes.to_vec())
    }

    fn interpret(&self, source: RawPtr, upside_down: bool) -> Result<()> {
        let status = unsafe { (self.interpret)(source.0 as *mut u8, upside_down) };
        if status != 0 {
            return Err(AbiError::Interpret { status });
        }
        Ok(())
    }

    fn flip_text(&self, source: RawPtr, len_slot: RawPtr, upside_down: bool) -> Result<RawPtr> {
        let out = unsafe {
            (self.flip_text)(source.0 as *mut u8, len_slot.0 as *mut u8, upside_down)
        };
        if out.is_null() {
            return Err(AbiError::NullOutput);
        }
        Ok(RawPtr(out as usize))
    }
}

impl Drop for DylibRuntime {
    fn drop(&mut self) {
        // Reclaim the callback context installed in `load`.
        drop(unsafe { Box::from_raw(self.sink_ctx) });
    }
}
