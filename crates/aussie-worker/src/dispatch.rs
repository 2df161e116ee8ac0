use std::sync::Arc;

use aussie_abi::{OutputSink, RuntimeAbi, RuntimeFactory};
use aussie_proto::{BoundaryRequest, BoundaryResponse};

use crate::marshal;

/// State owned by the isolated execution context: at most one runtime
/// instance, created on the first `initialize`.
pub(crate) struct ContextState {
    factory: RuntimeFactory,
    sink: Arc<dyn OutputSink>,
    runtime: Option<Box<dyn RuntimeAbi>>,
}

impl ContextState {
    pub(crate) fn new(factory: RuntimeFactory, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            factory,
            sink,
            runtime: None,
        }
    }

    /// Handle one request. Pure request in, response out; side effects flow
    /// through the runtime and its sink, which makes the protocol testable
    /// with no thread or transport involved.
    pub(crate) fn dispatch(&mut self, request: BoundaryRequest) -> BoundaryResponse {
        match request {
            BoundaryRequest::Initialize => self.initialize(),
            BoundaryRequest::Run {
                source,
                upside_down,
            } => self.run(&source, upside_down),
            BoundaryRequest::Flip {
                source,
                upside_down,
            } => self.flip(&source, upside_down),
        }
    }

    fn initialize(&mut self) -> BoundaryResponse {
        if self.runtime.is_some() {
            return BoundaryResponse::Ready;
        }
        match (self.factory)(self.sink.clone()) {
            Ok(runtime) => {
                self.runtime = Some(runtime);
                BoundaryResponse::Ready
            }
            Err(error) => {
                tracing::error!(%error, "failed to instantiate runtime");
                BoundaryResponse::Error {
                    message: error.to_string(),
                }
            }
        }
    }

    fn run(&self, source: &str, upside_down: bool) -> BoundaryResponse {
        let Some(runtime) = self.runtime.as_deref() else {
            return not_initialized();
        };
        match marshal::interpret(runtime, source, upside_down) {
            Ok(()) => BoundaryResponse::RunFinished,
            Err(error) => BoundaryResponse::Error {
                message: error.to_string(),
            },
        }
    }

    fn flip(&self, source: &str, upside_down: bool) -> BoundaryResponse {
        let Some(runtime) = self.runtime.as_deref() else {
            return not_initialized();
        };
        match marshal::flip(runtime, source, upside_down) {
            Ok(text) => BoundaryResponse::FlippedText { text },
            Err(error) => BoundaryResponse::Error {
                message: error.to_string(),
            },
        }
    }
}

fn not_initialized() -> BoundaryResponse {
    BoundaryResponse::Error {
        message: "runtime is not initialized".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use aussie_abi::test_utils::{CollectingSink, OnInterpret, ScriptedRuntime, Stream};

    fn scripted_factory(
        configure: impl Fn(ScriptedRuntime) -> ScriptedRuntime + Send + 'static,
    ) -> RuntimeFactory {
        Box::new(move |sink| {
            Ok(Box::new(configure(ScriptedRuntime::new().with_sink(sink))) as Box<dyn RuntimeAbi>)
        })
    }

    #[test]
    fn initialize_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let factory: RuntimeFactory = Box::new(move |sink| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedRuntime::new().with_sink(sink)) as Box<dyn RuntimeAbi>)
        });
        let mut state = ContextState::new(factory, CollectingSink::new());

        assert_eq!(state.dispatch(BoundaryRequest::Initialize), BoundaryResponse::Ready);
        assert_eq!(state.dispatch(BoundaryRequest::Initialize), BoundaryResponse::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_before_initialize_is_an_error_envelope() {
        let mut state = ContextState::new(scripted_factory(|rt| rt), CollectingSink::new());
        let response = state.dispatch(BoundaryRequest::Run {
            source: "GIMME 42;".to_owned(),
            upside_down: false,
        });
        assert!(matches!(response, BoundaryResponse::Error { .. }));
    }

    #[test]
    fn run_streams_through_the_sink() {
        let sink = CollectingSink::new();
        let factory = scripted_factory(|rt| {
            rt.on_interpret(OnInterpret::Emit(vec![
                (Stream::Stdout, "55".to_owned()),
                (Stream::Stderr, "warnin'".to_owned()),
            ]))
        });
        let mut state = ContextState::new(factory, sink.clone());

        assert_eq!(state.dispatch(BoundaryRequest::Initialize), BoundaryResponse::Ready);
        let response = state.dispatch(BoundaryRequest::Run {
            source: "GIMME fibonacci(10);".to_owned(),
            upside_down: false,
        });
        assert_eq!(response, BoundaryResponse::RunFinished);
        assert_eq!(
            sink.lines(),
            vec![
                (Stream::Stdout, "55".to_owned()),
                (Stream::Stderr, "warnin'".to_owned()),
            ]
        );
    }

    #[test]
    fn flip_answers_with_the_transformed_text() {
        let mut state = ContextState::new(scripted_factory(|rt| rt), CollectingSink::new());
        assert_eq!(state.dispatch(BoundaryRequest::Initialize), BoundaryResponse::Ready);

        let response = state.dispatch(BoundaryRequest::Flip {
            source: "abc".to_owned(),
            upside_down: true,
        });
        assert_eq!(
            response,
            BoundaryResponse::FlippedText {
                text: "ɔqɐ".to_owned()
            }
        );
    }

    #[test]
    fn initialize_failure_is_an_error_envelope_and_can_be_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let factory: RuntimeFactory = Box::new(move |sink| {
            if counted.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(aussie_abi::AbiError::AllocFailed { len: 64 })
            } else {
                Ok(Box::new(ScriptedRuntime::new().with_sink(sink)) as Box<dyn RuntimeAbi>)
            }
        });
        let mut state = ContextState::new(factory, CollectingSink::new());

        assert!(matches!(
            state.dispatch(BoundaryRequest::Initialize),
            BoundaryResponse::Error { .. }
        ));
        assert_eq!(state.dispatch(BoundaryRequest::Initialize), BoundaryResponse::Ready);
    }
}
