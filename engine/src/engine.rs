//! Backend Stream Client
//!
//! [`Engine::chat`] runs one user turn against the backend and publishes what
//! the user should see on the delivery channel. Two protocols are supported:
//!
//! - **Direct**: one streaming POST of `{"message": ...}`; the body goes
//!   through the section classifier and visible tokens are forwarded.
//! - **Reasoning**: a bounded series of non-streaming JSON rounds, each
//!   summarised as a status line, followed by one streamed final answer.
//!
//! The engine keeps no state between turns. Each call builds its own
//! classifier and history.

use std::ops::ControlFlow;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;

use crate::backend::{
    BodyDecoder, BodyFormat, ByteStream, ChatChunk, ChatMessage, ChatOptions, ChatRequest,
    ChatTransport, DirectRequest,
};
use crate::classifier::{SectionClassifier, StreamEvent};
use crate::config::{EngineConfig, Protocol};
use crate::delivery::{Delivery, DeliverySender};
use crate::error::{EngineError, Result};
use crate::reasoning::{self, NextAction, ReasoningRound};

/// `Break` once the delivery receiver is gone
type Flow = ControlFlow<()>;

/// The streaming conversation engine
pub struct Engine {
    transport: Arc<dyn ChatTransport>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine over a transport
    pub fn new(transport: Arc<dyn ChatTransport>, config: EngineConfig) -> Self {
        Self { transport, config }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one turn, publishing visible output on `delivery`
    ///
    /// Returns `Ok(())` early if the receiver has gone away.
    ///
    /// # Errors
    ///
    /// [`EngineError::Connection`] when the backend cannot be reached,
    /// [`EngineError::Protocol`] on malformed responses or an exhausted retry
    /// budget, [`EngineError::StreamRead`] when the body breaks off.
    pub async fn chat(&self, message: &str, delivery: &DeliverySender) -> Result<()> {
        match self.config.protocol {
            Protocol::Direct => self.chat_direct(message, delivery).await,
            Protocol::Reasoning => self.chat_reasoning(message, delivery).await,
        }
    }

    async fn chat_direct(&self, message: &str, delivery: &DeliverySender) -> Result<()> {
        let body = to_body(&DirectRequest {
            message: message.to_string(),
        })?;

        if deliver(delivery, Delivery::Activity).is_break() {
            return Ok(());
        }

        tracing::debug!(path = %self.config.direct_path, "direct request");
        let stream = self
            .transport
            .post_streaming(&self.config.direct_path, body)
            .await?;
        self.pump(stream, self.config.body_format, delivery).await
    }

    async fn chat_reasoning(&self, message: &str, delivery: &DeliverySender) -> Result<()> {
        let policy = &self.config.reasoning;
        let mut history = reasoning::initial_history(message);

        if deliver(delivery, Delivery::Activity).is_break() {
            return Ok(());
        }

        for step in 1..=policy.max_rounds {
            let (round, raw) = self.request_round(&history, step).await?;
            tracing::debug!(
                step,
                title = %round.title,
                next_action = ?round.next_action,
                "reasoning round"
            );

            if deliver(delivery, Delivery::Token(round.status_line(step))).is_break() {
                return Ok(());
            }
            history.push(ChatMessage::assistant(raw));

            if round.next_action == NextAction::FinalAnswer {
                break;
            }
        }

        let status = Delivery::Token(reasoning::FINAL_ANSWER_STATUS.to_string());
        if deliver(delivery, status).is_break() {
            return Ok(());
        }
        history.push(ChatMessage::user(reasoning::FINAL_ANSWER_REQUEST));

        let body = self.chat_request(history, true)?;
        let stream = self
            .transport
            .post_streaming(&self.config.chat_path, body)
            .await?;
        self.pump(stream, BodyFormat::NdJson, delivery).await
    }

    /// Request one round, retrying malformed content within the attempt budget
    ///
    /// Returns the parsed round and the cleaned content kept in history.
    async fn request_round(
        &self,
        history: &[ChatMessage],
        step: u32,
    ) -> Result<(ReasoningRound, String)> {
        let attempts = self.config.reasoning.max_attempts_per_round;

        for attempt in 1..=attempts {
            let body = self.chat_request(history.to_vec(), false)?;
            let response = self.transport.post(&self.config.chat_path, body).await?;
            let content = completion_content(&response)?;
            let cleaned = reasoning::clean_content(&content);

            if let Some(round) = ReasoningRound::parse(cleaned) {
                return Ok((round, cleaned.to_string()));
            }
            tracing::warn!(step, attempt, "reasoning round was not a JSON object");
        }

        Err(EngineError::Protocol(format!(
            "failed to get valid JSON response after {attempts} attempts in step {step}"
        )))
    }

    fn chat_request(&self, messages: Vec<ChatMessage>, stream: bool) -> Result<serde_json::Value> {
        to_body(&ChatRequest {
            model: self.config.model.clone(),
            messages,
            stream,
            options: ChatOptions {
                num_predict: self.config.max_tokens,
                temperature: self.config.reasoning.temperature,
            },
        })
    }

    /// Drive a response body through the decoder and classifier
    ///
    /// Stops quietly once the receiver is gone.
    async fn pump(
        &self,
        mut stream: ByteStream,
        format: BodyFormat,
        delivery: &DeliverySender,
    ) -> Result<()> {
        let mut decoder = BodyDecoder::new(format);
        let mut classifier =
            SectionClassifier::with_suppressed(self.config.suppressed_sections.iter().cloned());

        while let Some(chunk) = stream.next().await {
            let text = decoder.push(&chunk?)?;
            for event in classifier.push_str(&text) {
                if self.forward(event, delivery).is_break() {
                    return Ok(());
                }
            }
        }

        let mut events = classifier.push_str(&decoder.finish()?);
        events.extend(classifier.finish());
        for event in events {
            if self.forward(event, delivery).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn forward(&self, event: StreamEvent, delivery: &DeliverySender) -> Flow {
        match event {
            StreamEvent::Token(text) => deliver(delivery, Delivery::Token(text)),
            StreamEvent::Header(name) if self.config.show_headers => {
                deliver(delivery, Delivery::Token(format!("\n{name}:\n")))
            }
            StreamEvent::Header(_) | StreamEvent::Done => ControlFlow::Continue(()),
        }
    }
}

fn deliver(delivery: &DeliverySender, item: Delivery) -> Flow {
    match delivery.send(item) {
        Ok(()) => ControlFlow::Continue(()),
        Err(_) => {
            tracing::debug!("delivery receiver closed, abandoning turn");
            ControlFlow::Break(())
        }
    }
}

fn to_body<T: Serialize>(request: &T) -> Result<serde_json::Value> {
    serde_json::to_value(request)
        .map_err(|e| EngineError::Connection(format!("error marshalling request: {e}")))
}

/// `message.content` of a non-streaming completion body
fn completion_content(body: &str) -> Result<String> {
    let chunk: ChatChunk = serde_json::from_str(body)
        .map_err(|e| EngineError::Protocol(format!("error decoding response: {e}")))?;

    if let Some(error) = chunk.error {
        return Err(EngineError::Protocol(format!("backend error: {error}")));
    }

    chunk
        .message
        .map(|m| m.content)
        .ok_or_else(|| EngineError::Protocol("response has no message".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_content() {
        let body = r#"{"model":"m","message":{"role":"assistant","content":" {} "},"done":true}"#;
        assert_eq!(completion_content(body).unwrap(), " {} ");
    }

    #[test]
    fn test_completion_content_errors() {
        assert!(completion_content("<html>").unwrap_err().is_protocol());
        assert!(completion_content(r#"{"error":"boom"}"#)
            .unwrap_err()
            .to_string()
            .contains("boom"));
        assert!(completion_content(r#"{"done":true}"#).unwrap_err().is_protocol());
    }

    #[test]
    fn test_deliver_reports_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(deliver(&tx, Delivery::Activity).is_continue());
        drop(rx);
        assert!(deliver(&tx, Delivery::Activity).is_break());
    }
}
