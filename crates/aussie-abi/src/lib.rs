// Capability interface over the compiled Aussie++ runtime.
//
// The language implementation (lexer, parser, interpreter, the upside-down
// text transform) lives in a compiled artifact and is consumed as a black
// box through the handful of entry points declared on [`RuntimeAbi`].

pub mod buffer;
pub mod config;
pub mod dylib;
pub mod error;
pub mod test_utils;

mod abi;

pub use abi::{OutputSink, RawPtr, RuntimeAbi, RuntimeFactory};
pub use buffer::ScopedBuffer;
pub use config::RuntimeConfig;
pub use dylib::DylibRuntime;
pub use error::{AbiError, Result};
