//! Section Classifier
//!
//! A character-at-a-time lexical scanner that splits a model response into
//! named sections. Words are delimited by spaces and newlines; a word directly
//! followed by a colon is a section marker:
//!
//! ```text
//! THINKING: let me see     <- suppressed section, nothing emitted
//! ANSWER: 4                <- Header("ANSWER"), Token("4")
//! ```
//!
//! A reserved marker (`THINKING` by default) switches the scanner into
//! suppressed mode; any other marker starting with an uppercase letter is a
//! new header and switches it back. Tokens inside a suppressed section are
//! dropped on the floor.
//!
//! Outside suppressed sections whitespace is preserved: a delimiter that does
//! not end a word comes out as a token of its own. The one delimiter directly
//! after a header is part of the marker and is dropped with it.
//!
//! Build a fresh scanner for every backend call.

/// Section name whose content is never shown to the user
pub const THINKING_SECTION: &str = "THINKING";

/// Event produced by the classifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// A section marker (name without the colon)
    Header(String),
    /// A word followed by the delimiter that ended it, or a lone delimiter
    Token(String),
    /// End of stream
    Done,
}

impl StreamEvent {
    /// Token text, if this is a token
    #[must_use]
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(text) => Some(text),
            _ => None,
        }
    }
}

/// Incremental section scanner
#[derive(Clone, Debug)]
pub struct SectionClassifier {
    /// Current partial word (never contains a delimiter)
    word: String,
    /// Inside a non-emitting section
    suppressed: bool,
    /// Section names that enter suppressed mode
    suppressed_sections: Vec<String>,
    /// Previous character closed a header; its delimiter belongs to the marker
    after_header: bool,
}

impl Default for SectionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionClassifier {
    /// Create a scanner that suppresses the `THINKING` section
    #[must_use]
    pub fn new() -> Self {
        Self::with_suppressed([THINKING_SECTION])
    }

    /// Create a scanner with a custom set of suppressed section names
    pub fn with_suppressed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            word: String::new(),
            suppressed: false,
            suppressed_sections: names.into_iter().map(Into::into).collect(),
            after_header: false,
        }
    }

    /// Whether the scanner is currently inside a suppressed section
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Feed one character
    pub fn push(&mut self, ch: char) -> Option<StreamEvent> {
        let after_header = std::mem::take(&mut self.after_header);
        match ch {
            ' ' | '\n' => {
                let mut word = std::mem::take(&mut self.word);
                if self.suppressed || (word.is_empty() && after_header) {
                    return None;
                }
                word.push(ch);
                Some(StreamEvent::Token(word))
            }
            ':' => {
                if self.suppressed_sections.iter().any(|s| *s == self.word) {
                    self.word.clear();
                    self.suppressed = true;
                    return None;
                }
                if self.word.starts_with(|c: char| c.is_uppercase()) {
                    self.suppressed = false;
                    self.after_header = true;
                    return Some(StreamEvent::Header(std::mem::take(&mut self.word)));
                }
                self.word.push(ch);
                None
            }
            _ => {
                self.word.push(ch);
                None
            }
        }
    }

    /// Feed a chunk of text, collecting the events it completes
    pub fn push_str(&mut self, text: &str) -> Vec<StreamEvent> {
        text.chars().filter_map(|c| self.push(c)).collect()
    }

    /// Flush the remaining word and terminate the stream
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::with_capacity(2);
        let word = std::mem::take(&mut self.word);
        if !word.is_empty() && !self.suppressed {
            events.push(StreamEvent::Token(word));
        }
        events.push(StreamEvent::Done);
        events
    }

    /// Lazily classify a character iterator
    pub fn events<I>(self, chars: I) -> Events<I::IntoIter>
    where
        I: IntoIterator<Item = char>,
    {
        Events {
            chars: chars.into_iter(),
            classifier: self,
            tail: Vec::new(),
            finished: false,
        }
    }
}

/// Lazy event iterator returned by [`SectionClassifier::events`]
///
/// Always ends with [`StreamEvent::Done`].
pub struct Events<I> {
    chars: I,
    classifier: SectionClassifier,
    /// Remaining end-of-stream events, stored in reverse
    tail: Vec<StreamEvent>,
    finished: bool,
}

impl<I> Iterator for Events<I>
where
    I: Iterator<Item = char>,
{
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        if !self.finished {
            for ch in self.chars.by_ref() {
                if let Some(event) = self.classifier.push(ch) {
                    return Some(event);
                }
            }
            self.finished = true;
            self.tail = self.classifier.finish();
            self.tail.reverse();
        }
        self.tail.pop()
    }
}

/// Classify a complete text with a fresh default scanner
#[must_use]
pub fn classify(text: &str) -> Vec<StreamEvent> {
    SectionClassifier::new().events(text.chars()).collect()
}
