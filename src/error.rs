//! Error types for response stubbing.

use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by stub registration, generation and dispatch.
#[derive(Debug, Error)]
pub enum StubError {
    #[error("stubbing is not enabled for this client; construct it with `stub_responses: true`")]
    StubbingDisabled,

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("unknown shape: {0}")]
    UnknownShape(String),

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("operation {0} does not return data; stubbed data is not accepted")]
    NoOutput(String),

    #[error("invalid stub data: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A service error parsed from a (possibly stubbed) wire response.
    #[error("{code}: {message}")]
    Service {
        code: String,
        message: String,
        status_code: u16,
    },

    /// A caller-supplied error object, raised as-is.
    #[error("{0}")]
    Stubbed(Arc<dyn std::error::Error + Send + Sync>),

    #[error("failed to parse {protocol} response: {reason}")]
    Parse { protocol: String, reason: String },

    #[error("stubbing is disabled and no transport is configured")]
    NoTransport,

    #[error("transport error: {0}")]
    Transport(String),
}

impl StubError {
    pub(crate) fn parse(protocol: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StubError::Parse {
            protocol: protocol.into(),
            reason: reason.to_string(),
        }
    }

    /// The service error code, when this is a service error.
    pub fn code(&self) -> Option<&str> {
        match self {
            StubError::Service { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StubError>;
