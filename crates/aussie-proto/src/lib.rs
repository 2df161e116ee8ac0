//! Protocol envelopes for the execution boundary.
//!
//! The boundary speaks a small request/response protocol with two one-way
//! event streams. Everything here is plain serde data so the protocol can
//! be exercised and serialized independent of any particular transport.

use serde::{Deserialize, Serialize};

/// A stream-tagged unit of text produced while a program runs.
///
/// Wire shape: `{"type":"stdout","data":...}` / `{"type":"stderr","data":...}`.
/// Events within one stream preserve emission order; no ordering is defined
/// across the two streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutputEvent {
    Stdout(String),
    Stderr(String),
}

impl OutputEvent {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self::Stdout(text.into())
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self::Stderr(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Stdout(text) | Self::Stderr(text) => text,
        }
    }

    pub fn is_stderr(&self) -> bool {
        matches!(self, Self::Stderr(_))
    }
}

/// Requests the host sends into the execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryRequest {
    /// Load and instantiate the runtime. Idempotent.
    Initialize,
    /// Hand the program to the interpreter. Output arrives as events; the
    /// response only signals that the entry point returned.
    Run { source: String, upside_down: bool },
    /// Transform the program text, returning the flipped form.
    Flip { source: String, upside_down: bool },
}

/// Responses paired one-to-one with [`BoundaryRequest`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryResponse {
    Ready,
    RunFinished,
    FlippedText { text: String },
    /// The contract defines no structured error; failures cross the
    /// boundary as a message.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_events_match_the_wire_shape() {
        let event = OutputEvent::stdout("FAIR DINKUM");
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"type":"stdout","data":"FAIR DINKUM"}"#
        );

        let event = OutputEvent::stderr("OI MATE!");
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"type":"stderr","data":"OI MATE!"}"#
        );
    }

    #[test]
    fn output_events_round_trip() {
        let event: OutputEvent = serde_json::from_str(r#"{"type":"stderr","data":"strewth"}"#)
            .unwrap();
        assert_eq!(event, OutputEvent::stderr("strewth"));
        assert!(event.is_stderr());
        assert_eq!(event.text(), "strewth");
    }

    #[test]
    fn requests_are_tagged_unions() {
        let request = BoundaryRequest::Run {
            source: "GIMME 42;".to_owned(),
            upside_down: false,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"type":"run","source":"GIMME 42;","upside_down":false}"#
        );

        let request: BoundaryRequest = serde_json::from_str(r#"{"type":"initialize"}"#).unwrap();
        assert_eq!(request, BoundaryRequest::Initialize);
    }

    #[test]
    fn responses_are_tagged_unions() {
        let response = BoundaryResponse::FlippedText {
            text: "ɔqɐ".to_owned(),
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"type":"flipped_text","text":"ɔqɐ"}"#
        );
    }
}
