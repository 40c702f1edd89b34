//! HTTP Transport
//!
//! [`ChatTransport`] over `reqwest`, pointed at a local model server.
//!
//! # Endpoints
//!
//! - `/api/chat` - chat completions with full message history
//! - `/chat/stream` - raw character stream (direct protocol)
//!
//! Non-2xx responses are reported as protocol errors carrying the status and
//! body text, matching what the backend printed.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::traits::{ByteStream, ChatTransport};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// `reqwest`-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for `base_url`
    ///
    /// `timeout` bounds connecting and each wait for more body data, never
    /// the whole response: a long answer keeps streaming as long as bytes
    /// keep arriving.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| EngineError::Connection(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Create from engine configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint path
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn send(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(EngineError::from_send)?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Protocol(format!(
                "backend returned {status}: {body}"
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post(&self, path: &str, body: serde_json::Value) -> Result<String> {
        let response = self.send(path, &body).await?;
        response.text().await.map_err(EngineError::from_read)
    }

    async fn post_streaming(&self, path: &str, body: serde_json::Value) -> Result<ByteStream> {
        let response = self.send(path, &body).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(EngineError::from_read));
        Ok(stream.boxed())
    }
}
