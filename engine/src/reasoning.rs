//! Reasoning Rounds
//!
//! In reasoning mode the model is asked to think out loud as a sequence of
//! JSON objects, one per request:
//!
//! ```json
//! {"title": "Restate the problem", "content": "...", "next_action": "continue"}
//! ```
//!
//! This module holds the prompt material and the parsing of a single round.
//! The request loop lives in [`crate::engine`].

use serde::Deserialize;

use crate::backend::ChatMessage;

/// System instruction that opens every reasoning conversation
pub const SYSTEM_PROMPT: &str = "You are an expert assistant that explains its reasoning step by step. \
For each step, provide a title that describes what you are doing in that step, along with the content. \
Decide if you need another step or if you are ready to give the final answer. \
Respond with exactly one JSON object per message, using the keys 'title', 'content' and 'next_action' \
(either 'continue' or 'final_answer'). Do not write anything outside the JSON object. \
Use as many reasoning steps as possible, at least three. Be aware of your limitations as a language model \
and of what you can and cannot do. Explore alternative answers and consider that you may be wrong. \
When you re-examine, actually re-examine, using a different approach.";

/// Assistant acknowledgement placed after the user message
pub const PRIMING_ACK: &str =
    "Understood. I will provide each step as a JSON object, with no additional text.";

/// User message that closes the reasoning loop
pub const FINAL_ANSWER_REQUEST: &str =
    "Please provide the final answer based on your reasoning above.";

/// Status line emitted before the final answer streams
pub const FINAL_ANSWER_STATUS: &str = "\nGenerating final answer...\n";

/// Preamble some models put in front of the first object
const FIRST_STEP_PREAMBLE: &str = "Here is the first step:";

/// What the model wants to do after a round
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NextAction {
    /// Ask for another round
    #[default]
    Continue,
    /// Stop reasoning and stream the answer
    FinalAnswer,
}

impl NextAction {
    /// Interpret a `next_action` value; anything but `final_answer` continues
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("final_answer") {
            Self::FinalAnswer
        } else {
            Self::Continue
        }
    }
}

/// One accepted reasoning step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReasoningRound {
    /// Short description of the step
    pub title: String,
    /// The step's reasoning text
    pub content: String,
    /// Whether another round follows
    pub next_action: NextAction,
}

#[derive(Deserialize)]
struct RawRound {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    next_action: String,
}

impl ReasoningRound {
    /// Parse cleaned round content; `None` means the round must be retried
    #[must_use]
    pub fn parse(content: &str) -> Option<Self> {
        if !content.starts_with('{') {
            return None;
        }
        let raw: RawRound = serde_json::from_str(content).ok()?;
        Some(Self {
            title: raw.title,
            content: raw.content,
            next_action: NextAction::parse(&raw.next_action),
        })
    }

    /// Status token shown to the user for round `step` (1-based)
    #[must_use]
    pub fn status_line(&self, step: u32) -> String {
        format!("Thinking step {step}: {}\n", self.title)
    }
}

/// Trim model output and strip the first-step preamble
#[must_use]
pub fn clean_content(content: &str) -> &str {
    let content = content.trim();
    content
        .strip_prefix(FIRST_STEP_PREAMBLE)
        .unwrap_or(content)
        .trim()
}

/// Opening history for a reasoning conversation
#[must_use]
pub fn initial_history(user_message: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_message),
        ChatMessage::assistant(PRIMING_ACK),
    ]
}
