use std::path::PathBuf;
use std::sync::Arc;

use crate::abi::RuntimeFactory;
use crate::dylib::DylibRuntime;

/// Where the compiled runtime comes from.
#[derive(Debug, Clone)]
pub enum RuntimeConfig {
    /// A shared library on disk exposing the Aussie++ entry points.
    Dylib { path: PathBuf },
}

impl RuntimeConfig {
    pub fn dylib(path: impl Into<PathBuf>) -> Self {
        Self::Dylib { path: path.into() }
    }

    /// Build the factory the execution context calls to instantiate the
    /// runtime. The factory runs on the worker thread, so the instance
    /// never crosses threads.
    pub fn into_factory(self) -> RuntimeFactory {
        match self {
            Self::Dylib { path } => Box::new(move |sink: Arc<dyn crate::OutputSink>| {
                let runtime = DylibRuntime::load(&path, sink)?;
                Ok(Box::new(runtime) as Box<dyn crate::RuntimeAbi>)
            }),
        }
    }
}
