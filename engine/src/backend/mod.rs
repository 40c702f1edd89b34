//! Model Backend Integration
//!
//! Everything that touches the model server over HTTP:
//!
//! - [`ChatTransport`]: the HTTP seam the engine calls through
//! - [`HttpTransport`]: `reqwest` implementation of it
//! - [`BodyDecoder`]: response body bytes to text (raw or NDJSON)
//! - [`BackendLiveness`]: is-running / start / stop contract for the server
//!
//! # Usage
//!
//! ```ignore
//! use qcli_engine::backend::{ChatTransport, HttpTransport};
//!
//! let transport = HttpTransport::new("http://localhost:11434", timeout)?;
//! let body = transport.post("/api/chat", request).await?;
//! ```

mod body;
mod liveness;
mod ollama;
mod traits;

pub use body::{BodyDecoder, BodyFormat};
pub use liveness::{BackendLiveness, OllamaProcess};
pub use ollama::HttpTransport;
pub use traits::{
    ByteStream, ChatChunk, ChatMessage, ChatOptions, ChatRequest, ChatRole, ChatTransport,
    ChunkMessage, DirectRequest,
};
