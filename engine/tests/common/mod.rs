//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use qcli_engine::backend::{ByteStream, ChatTransport};
use qcli_engine::{Delivery, Engine, EngineConfig, EngineError, Result};

/// One request seen by the scripted transport
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
    pub streaming: bool,
}

impl RecordedRequest {
    /// `messages[*].content` of a chat request
    pub fn contents(&self) -> Vec<String> {
        self.body["messages"]
            .as_array()
            .map(|messages| {
                messages
                    .iter()
                    .map(|m| m["content"].as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A body chunk, or a read failure at that point
pub type ScriptedChunk = std::result::Result<Vec<u8>, String>;

/// Transport that replays canned bodies and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    posts: Mutex<VecDeque<String>>,
    streams: Mutex<VecDeque<Vec<ScriptedChunk>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a complete body for the next buffered POST
    pub fn push_post(&self, body: impl Into<String>) {
        self.posts.lock().unwrap().push_back(body.into());
    }

    /// Queue a chunked body for the next streaming POST
    pub fn push_stream<I, B>(&self, chunks: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        let chunks = chunks.into_iter().map(|c| Ok(c.into())).collect();
        self.streams.lock().unwrap().push_back(chunks);
    }

    /// Queue a streaming body that may fail part way through
    pub fn push_stream_chunks(&self, chunks: Vec<ScriptedChunk>) {
        self.streams.lock().unwrap().push_back(chunks);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, path: &str, body: Value, streaming: bool) {
        self.requests.lock().unwrap().push(RecordedRequest {
            path: path.to_string(),
            body,
            streaming,
        });
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn post(&self, path: &str, body: Value) -> Result<String> {
        self.record(path, body, false);
        self.posts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EngineError::Connection("connection refused".to_string()))
    }

    async fn post_streaming(&self, path: &str, body: Value) -> Result<ByteStream> {
        self.record(path, body, true);
        let chunks = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EngineError::Connection("connection refused".to_string()))?;
        let stream =
            futures::stream::iter(chunks.into_iter().map(|c| c.map_err(EngineError::StreamRead)));
        Ok(stream.boxed())
    }
}

/// Non-streaming chat completion body carrying `content`
pub fn completion(content: &str) -> String {
    json!({
        "model": "llama3.2",
        "message": {"role": "assistant", "content": content},
        "done": true
    })
    .to_string()
}

/// One reasoning round as the model would write it
pub fn round(title: &str, content: &str, next_action: &str) -> String {
    json!({"title": title, "content": content, "next_action": next_action}).to_string()
}

/// NDJSON streaming body, one line per content increment
pub fn ndjson(parts: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    let line = |content: &str, done: bool| {
        json!({"message": {"role": "assistant", "content": content}, "done": done}).to_string()
    };
    for part in parts {
        body.push_str(&line(part, false));
        body.push('\n');
    }
    body.push_str(&line("", true));
    body.push('\n');
    body.into_bytes()
}

pub fn engine(transport: &Arc<ScriptedTransport>, config: EngineConfig) -> Engine {
    Engine::new(transport.clone(), config)
}

/// Run one turn and collect everything it delivered
pub async fn run_turn(engine: &Engine, message: &str) -> (Result<()>, Vec<Delivery>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = engine.chat(message, &tx).await;
    drop(tx);

    let mut delivered = Vec::new();
    while let Some(item) = rx.recv().await {
        delivered.push(item);
    }
    (result, delivered)
}

/// Token texts, in order
pub fn tokens(delivered: &[Delivery]) -> Vec<String> {
    delivered
        .iter()
        .filter_map(|d| match d {
            Delivery::Token(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}
