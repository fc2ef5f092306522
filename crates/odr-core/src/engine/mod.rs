//! Boundary to the hosted research engine.
//!
//! The engine is an external collaborator: the driver only sees the raw item
//! stream of one round plus the conversation it hands over. [`ResearchEngine`]
//! is that seam; [`remote::RemoteEngine`] is the HTTP+SSE adapter, tests
//! script their own implementations.

use std::fmt;

use futures_util::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::core::history::Turn;

pub mod remote;

pub use remote::RemoteEngine;

/// Categories of engine errors for consistent handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Failed to parse a stream item (invalid JSON, invalid SSE)
    Parse,
    /// Transport failure while the round stream was open
    Stream,
    /// Error event emitted by the engine mid-round
    Engine,
    /// Invalid connection settings (bad base URL)
    Config,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErrorKind::HttpStatus => write!(f, "http_status"),
            EngineErrorKind::Parse => write!(f, "parse"),
            EngineErrorKind::Stream => write!(f, "stream"),
            EngineErrorKind::Engine => write!(f, "engine"),
            EngineErrorKind::Config => write!(f, "config"),
        }
    }
}

/// Structured error from the engine boundary with kind and details.
#[derive(Debug, Clone)]
pub struct EngineError {
    /// Error category
    pub kind: EngineErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g. raw error body)
    pub details: Option<String>,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, lifting a JSON `message` field into the
    /// summary when the body carries one.
    pub fn http_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}");
        let details = if body.is_empty() {
            None
        } else {
            if let Ok(json) = serde_json::from_str::<Value>(body)
                && let Some(msg) = json.get("message").and_then(Value::as_str)
            {
                return Self {
                    kind: EngineErrorKind::HttpStatus,
                    message: format!("HTTP {status}: {msg}"),
                    details: Some(body.to_string()),
                };
            }
            Some(body.to_string())
        };
        Self {
            kind: EngineErrorKind::HttpStatus,
            message,
            details,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Parse, message)
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Stream, message)
    }

    /// Creates an error from a mid-stream `error` event payload.
    pub fn from_error_event(data: &str) -> Self {
        let message = serde_json::from_str::<Value>(data)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "engine reported an error".to_string());
        Self {
            kind: EngineErrorKind::Engine,
            message,
            details: Some(data.to_string()),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// One round's raw item stream: JSON items in arrival order until exhaustion.
pub type EngineStream = BoxStream<'static, EngineResult<Value>>;

/// Research knobs forwarded to the engine with every round.
///
/// Locally these only feed display denominators; the engine owns their
/// semantics.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchKnobs {
    pub max_concurrent_research_units: u32,
    pub max_researcher_iterations: u32,
    pub max_react_tool_calls: u32,
    pub search_api: String,
    pub research_model: String,
}

impl From<&Config> for ResearchKnobs {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent_research_units: config.max_concurrent_research_units,
            max_researcher_iterations: config.max_researcher_iterations,
            max_react_tool_calls: config.max_react_tool_calls,
            search_api: config.search_api.clone(),
            research_model: config.research_model.clone(),
        }
    }
}

/// An engine capable of running one research round over a conversation.
#[allow(async_fn_in_trait)]
pub trait ResearchEngine {
    /// Opens one streaming round over the conversation so far.
    async fn open_round(&self, turns: &[Turn], knobs: &ResearchKnobs) -> EngineResult<EngineStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_lifts_json_message() {
        let err = EngineError::http_status(503, r#"{"message": "engine overloaded"}"#);

        assert_eq!(err.kind, EngineErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 503: engine overloaded");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_keeps_opaque_body_as_details() {
        let err = EngineError::http_status(500, "<html>boom</html>");

        assert_eq!(err.message, "HTTP 500");
        assert_eq!(err.details.as_deref(), Some("<html>boom</html>"));
    }

    #[test]
    fn test_http_status_empty_body() {
        let err = EngineError::http_status(404, "");

        assert_eq!(err.message, "HTTP 404");
        assert_eq!(err.details, None);
    }

    #[test]
    fn test_error_event_with_message() {
        let err = EngineError::from_error_event(r#"{"message": "search api quota exceeded"}"#);

        assert_eq!(err.kind, EngineErrorKind::Engine);
        assert_eq!(err.to_string(), "search api quota exceeded");
    }

    #[test]
    fn test_error_event_without_message_still_errors() {
        let err = EngineError::from_error_event("not json at all");

        assert_eq!(err.kind, EngineErrorKind::Engine);
        assert_eq!(err.message, "engine reported an error");
        assert_eq!(err.details.as_deref(), Some("not json at all"));
    }

    #[test]
    fn test_knobs_mirror_config() {
        let config = Config::default();
        let knobs = ResearchKnobs::from(&config);

        assert_eq!(knobs.max_researcher_iterations, 6);
        assert_eq!(knobs.search_api, "tavily");

        let wire = serde_json::to_value(&knobs).unwrap();
        assert_eq!(wire["max_concurrent_research_units"], 5);
        assert_eq!(wire["research_model"], "openai:gpt-4.1");
    }
}
