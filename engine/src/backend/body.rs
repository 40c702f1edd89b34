//! Response Body Decoding
//!
//! Turns raw body chunks into text the classifier can walk one character at a
//! time. Network reads are buffered by the HTTP client; this layer only has to
//! deal with boundaries that fall in awkward places:
//!
//! - **Raw**: a multi-byte UTF-8 sequence split across two chunks is held
//!   back until the rest arrives.
//! - **NdJson**: a JSON line split across two chunks is held back until its
//!   newline arrives. Each complete line must be a chat completion object;
//!   its `message.content` is the text increment.

use serde::{Deserialize, Serialize};

use super::traits::ChatChunk;
use crate::error::{EngineError, Result};

/// How a streaming response body is encoded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// Plain characters (may embed `SECTION:` markers)
    #[default]
    Raw,
    /// Newline-delimited `{"message":{"content":...}}` objects
    NdJson,
}

impl std::str::FromStr for BodyFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "ndjson" | "json" => Ok(Self::NdJson),
            other => Err(format!("unknown body format '{other}' (expected raw or ndjson)")),
        }
    }
}

/// Incremental body decoder
#[derive(Debug)]
pub struct BodyDecoder {
    format: BodyFormat,
    /// Bytes not yet turned into text
    pending: Vec<u8>,
}

impl BodyDecoder {
    /// Create a decoder for the given format
    #[must_use]
    pub fn new(format: BodyFormat) -> Self {
        Self {
            format,
            pending: Vec::new(),
        }
    }

    /// Feed one body chunk, returning the text it completes
    pub fn push(&mut self, bytes: &[u8]) -> Result<String> {
        self.pending.extend_from_slice(bytes);
        match self.format {
            BodyFormat::Raw => Ok(self.drain_utf8()),
            BodyFormat::NdJson => self.drain_lines(),
        }
    }

    /// Flush whatever is left at end of body
    pub fn finish(&mut self) -> Result<String> {
        let rest = std::mem::take(&mut self.pending);
        match self.format {
            BodyFormat::Raw => Ok(String::from_utf8_lossy(&rest).into_owned()),
            BodyFormat::NdJson => parse_line(&rest).map(Option::unwrap_or_default),
        }
    }

    fn drain_utf8(&mut self) -> String {
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        // Incomplete sequence at the end, wait for more bytes
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(content) = parse_line(&line)? {
                out.push_str(&content);
            }
        }
        Ok(out)
    }
}

/// Parse one NDJSON line; blank lines yield `None`
fn parse_line(line: &[u8]) -> Result<Option<String>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let chunk: ChatChunk = serde_json::from_str(text)
        .map_err(|e| EngineError::Protocol(format!("error decoding chunk: {e}; chunk: {text}")))?;

    if let Some(error) = chunk.error {
        return Err(EngineError::Protocol(format!("backend error: {error}")));
    }

    Ok(Some(chunk.message.map(|m| m.content).unwrap_or_default()))
}
