//! Engine Errors
//!
//! Every failure of a backend call surfaces as an [`EngineError`]. The engine
//! never degrades silently: the turn dispatcher reports the error to the
//! surface and moves on to the next turn.

use thiserror::Error;

/// Errors produced by the streaming conversation engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Backend unreachable or the request could not be built
    #[error("connection error: {0}")]
    Connection(String),

    /// Malformed JSON, unexpected body shape, or an exhausted retry budget
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O failure while reading a response body
    #[error("stream read error: {0}")]
    StreamRead(String),

    /// The backend process could not be started or stopped
    #[error("backend liveness error: {0}")]
    Liveness(String),
}

impl EngineError {
    /// Map a reqwest error raised while sending a request
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_decode() || err.is_body() {
            Self::Protocol(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }

    /// Map a reqwest error raised while reading a response body
    pub(crate) fn from_read(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::StreamRead(format!("timed out waiting for response data: {err}"))
        } else if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::StreamRead(err.to_string())
        }
    }

    /// Whether this error is a protocol violation
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, EngineError>;
