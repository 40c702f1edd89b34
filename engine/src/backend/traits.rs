//! Backend Transport Traits
//!
//! The engine talks to the model backend through [`ChatTransport`], a thin
//! HTTP seam with exactly the two request shapes the engine needs: a
//! buffered POST (one complete body) and a streaming POST (a body delivered
//! chunk by chunk). Production code uses [`super::HttpTransport`]; tests
//! substitute a scripted transport.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Chunked response body
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Chat message role on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instruction
    System,
    /// End user
    User,
    /// Model output
    Assistant,
}

/// One message of the history sent to the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote it
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling options passed through to the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Maximum tokens to generate
    pub num_predict: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// `POST /api/chat` request body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Full history (the backend keeps no state between calls)
    pub messages: Vec<ChatMessage>,
    /// Whether to stream NDJSON chunks
    pub stream: bool,
    /// Sampling options
    pub options: ChatOptions,
}

/// Direct streaming request body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectRequest {
    /// The user's text
    pub message: String,
}

/// One chat completion object (`{"message": {"content": ...}}`)
///
/// Used both for NDJSON stream lines and for non-streaming bodies.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatChunk {
    /// Completion message
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    /// Backend-reported error
    #[serde(default)]
    pub error: Option<String>,
    /// Last chunk of a stream
    #[serde(default)]
    pub done: bool,
}

/// Message payload of a [`ChatChunk`]
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkMessage {
    /// Content increment (or full content for non-streaming calls)
    #[serde(default)]
    pub content: String,
}

/// HTTP seam between the engine and the model backend
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// POST a JSON body and return the complete response body
    async fn post(&self, path: &str, body: serde_json::Value) -> Result<String>;

    /// POST a JSON body and return the response body as a chunk stream
    async fn post_streaming(&self, path: &str, body: serde_json::Value) -> Result<ByteStream>;
}
