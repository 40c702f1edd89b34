//! Renderer State Machine
//!
//! Everything the chat screen knows lives in [`UiState`], and everything
//! that can happen to it is a [`UiEvent`]. [`UiState::update`] applies one
//! event and returns the [`Effect`]s the adapter has to carry out: queueing
//! a turn, starting or stopping the spinner, quitting.
//!
//! ```text
//!            submit (non-empty)
//!   ┌──────┐ ─────────────────▶ ┌─────────┐
//!   │ Idle │                    │ Waiting │ ◀── Token / Activity / Failed
//!   └──────┘ ◀───────────────── └─────────┘
//!            TurnEnded | StreamClosed
//! ```
//!
//! This module performs no I/O and knows nothing about the terminal. Keys
//! arrive already translated into [`KeyInput`].

use qcli_engine::Delivery;

/// Spinner frames (braille dots)
pub const SPINNER_FRAMES: [char; 8] = ['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

/// Transcript text shown before the first message
pub const PLACEHOLDER: &str = "Type a message and press Enter to send.";

/// Input box height in lines
pub const INPUT_HEIGHT: u16 = 5;

/// Lines scrolled per mouse wheel notch
const WHEEL_LINES: usize = 3;

/// Who wrote a message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The person at the keyboard
    User,
    /// The model
    Assistant,
}

impl Role {
    /// Transcript prefix for this role
    pub fn prefix(&self) -> &'static str {
        match self {
            Role::User => "You: ",
            Role::Assistant => "AI: ",
        }
    }
}

/// One transcript entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Author
    pub role: Role,
    /// Text so far
    pub content: String,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Whether a turn is in flight
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UiPhase {
    /// Input enabled
    #[default]
    Idle,
    /// A turn is in flight; input disabled
    Waiting,
}

/// Terminal-independent key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character
    Char(char),
    /// Submit
    Enter,
    /// Insert a newline
    AltEnter,
    /// Delete the last character
    Backspace,
    /// Quit (idle only)
    Esc,
    /// Hard cancel
    CtrlC,
    /// Scroll transcript up half a page
    PageUp,
    /// Scroll transcript down half a page
    PageDown,
    /// Jump to the top of the transcript
    Top,
    /// Jump to the latest line
    Bottom,
}

/// Wheel direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Toward older lines
    Up,
    /// Toward newer lines
    Down,
}

/// Everything the state machine reacts to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    /// A key press
    Key(KeyInput),
    /// Submit this text as if typed and entered
    SubmitText(String),
    /// Terminal size changed
    Resize {
        /// Columns
        width: u16,
        /// Rows
        height: u16,
    },
    /// Something arrived from the worker
    Delivered(Delivery),
    /// The worker dropped its delivery sender
    StreamClosed,
    /// Spinner timer fired
    SpinnerTick,
    /// Mouse wheel
    Scroll(ScrollDirection),
}

/// Work the adapter performs after a transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Push this text onto the turn queue
    SubmitTurn(String),
    /// Start spinner ticks
    StartSpinner,
    /// Stop spinner ticks
    StopSpinner,
    /// Leave the application
    Quit,
}

/// Transcript scroll position
///
/// `offset` counts lines up from the bottom; 0 shows the latest line.
/// `total_lines` is written back by the renderer after wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollState {
    /// Lines from the bottom
    pub offset: usize,
    /// Wrapped lines in the transcript
    pub total_lines: usize,
}

impl ScrollState {
    fn up(&mut self, lines: usize) {
        let max = self.total_lines.saturating_sub(1);
        self.offset = (self.offset + lines).min(max);
    }

    fn down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    fn to_top(&mut self) {
        self.offset = self.total_lines.saturating_sub(1);
    }

    fn to_bottom(&mut self) {
        self.offset = 0;
    }
}

/// The whole chat screen
#[derive(Clone, Debug, Default)]
pub struct UiState {
    phase: UiPhase,
    conversation: Vec<Message>,
    input: String,
    /// An assistant message is open for the current turn
    assistant_open: bool,
    last_error: Option<String>,
    spinner_frame: usize,
    /// Terminal size (columns, rows)
    size: (u16, u16),
    /// Transcript scroll position
    pub scroll: ScrollState,
    /// The worker has gone away
    stream_closed: bool,
}

impl UiState {
    /// Fresh idle state for a terminal of the given size
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            size: (width, height),
            ..Self::default()
        }
    }

    pub fn phase(&self) -> UiPhase {
        self.phase
    }

    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Error from the last failed turn, shown in the status line
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn stream_closed(&self) -> bool {
        self.stream_closed
    }

    /// Current spinner glyph
    pub fn spinner(&self) -> char {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }

    /// Whether an assistant message is still receiving tokens
    pub fn is_streaming(&self) -> bool {
        self.assistant_open
    }

    /// Apply one event
    pub fn update(&mut self, event: UiEvent) -> Vec<Effect> {
        match event {
            UiEvent::Key(key) => self.on_key(key),
            UiEvent::SubmitText(text) => match self.phase {
                UiPhase::Idle => self.submit(text),
                UiPhase::Waiting => Vec::new(),
            },
            UiEvent::Resize { width, height } => {
                self.size = (width, height);
                Vec::new()
            }
            UiEvent::Delivered(delivery) => self.on_delivery(delivery),
            UiEvent::StreamClosed => {
                self.stream_closed = true;
                self.end_turn()
            }
            UiEvent::SpinnerTick => {
                if self.phase == UiPhase::Waiting {
                    self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
                }
                Vec::new()
            }
            UiEvent::Scroll(direction) => {
                match direction {
                    ScrollDirection::Up => self.scroll.up(WHEEL_LINES),
                    ScrollDirection::Down => self.scroll.down(WHEEL_LINES),
                }
                Vec::new()
            }
        }
    }

    fn on_key(&mut self, key: KeyInput) -> Vec<Effect> {
        if key == KeyInput::CtrlC {
            return vec![Effect::Quit];
        }
        if self.phase == UiPhase::Waiting {
            return Vec::new();
        }

        match key {
            KeyInput::Esc => return vec![Effect::Quit],
            KeyInput::Enter => {
                let text = self.input.clone();
                return self.submit(text);
            }
            KeyInput::Char(c) => self.input.push(c),
            KeyInput::AltEnter => self.input.push('\n'),
            KeyInput::Backspace => {
                self.input.pop();
            }
            KeyInput::PageUp => self.scroll.up(self.page_size()),
            KeyInput::PageDown => self.scroll.down(self.page_size()),
            KeyInput::Top => self.scroll.to_top(),
            KeyInput::Bottom => self.scroll.to_bottom(),
            KeyInput::CtrlC => {}
        }
        Vec::new()
    }

    fn submit(&mut self, text: String) -> Vec<Effect> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        self.conversation.push(Message::new(Role::User, text.clone()));
        self.input.clear();
        self.phase = UiPhase::Waiting;
        self.assistant_open = false;
        self.last_error = None;
        self.spinner_frame = 0;
        self.scroll.to_bottom();

        vec![Effect::SubmitTurn(text), Effect::StartSpinner]
    }

    fn on_delivery(&mut self, delivery: Delivery) -> Vec<Effect> {
        if self.phase == UiPhase::Idle {
            // Late delivery from a finished turn
            return Vec::new();
        }

        match delivery {
            Delivery::Activity => Vec::new(),
            Delivery::Token(text) => {
                match self.conversation.last_mut() {
                    Some(last) if self.assistant_open => last.content.push_str(&text),
                    _ => {
                        self.conversation.push(Message::new(Role::Assistant, text));
                        self.assistant_open = true;
                    }
                }
                self.scroll.to_bottom();
                Vec::new()
            }
            Delivery::Failed(message) => {
                self.last_error = Some(message);
                Vec::new()
            }
            Delivery::TurnEnded => self.end_turn(),
        }
    }

    fn end_turn(&mut self) -> Vec<Effect> {
        if self.phase == UiPhase::Idle {
            return Vec::new();
        }
        self.phase = UiPhase::Idle;
        self.assistant_open = false;
        vec![Effect::StopSpinner]
    }

    /// Half the transcript height
    fn page_size(&self) -> usize {
        let transcript = self.size.1.saturating_sub(INPUT_HEIGHT + 1);
        usize::from(transcript / 2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn waiting_after(text: &str) -> UiState {
        let mut state = UiState::new(80, 24);
        state.update(UiEvent::SubmitText(text.to_string()));
        state
    }

    fn token(text: &str) -> UiEvent {
        UiEvent::Delivered(Delivery::Token(text.to_string()))
    }

    #[test]
    fn test_submit_from_idle() {
        let mut state = UiState::new(80, 24);
        for c in "hi".chars() {
            state.update(UiEvent::Key(KeyInput::Char(c)));
        }
        let effects = state.update(UiEvent::Key(KeyInput::Enter));

        assert_eq!(
            effects,
            vec![Effect::SubmitTurn("hi".to_string()), Effect::StartSpinner]
        );
        assert_eq!(state.phase(), UiPhase::Waiting);
        assert_eq!(state.input(), "");
        assert_eq!(
            state.conversation(),
            &[Message::new(Role::User, "hi")]
        );
    }

    #[test]
    fn test_empty_submit_is_noop() {
        let mut state = UiState::new(80, 24);
        assert!(state.update(UiEvent::Key(KeyInput::Enter)).is_empty());
        assert!(state.update(UiEvent::SubmitText("  \n ".to_string())).is_empty());
        assert_eq!(state.phase(), UiPhase::Idle);
        assert!(state.conversation().is_empty());
    }

    #[test]
    fn test_tokens_build_one_assistant_message() {
        let mut state = waiting_after("2+2?");
        state.update(token("it "));
        state.update(token("is "));
        state.update(token("4"));

        assert_eq!(state.conversation().len(), 2);
        assert_eq!(state.conversation()[1], Message::new(Role::Assistant, "it is 4"));
        assert!(state.is_streaming());
        assert_eq!(state.phase(), UiPhase::Waiting);
    }

    #[test]
    fn test_turn_ended_returns_to_idle() {
        let mut state = waiting_after("q");
        state.update(token("a"));
        let effects = state.update(UiEvent::Delivered(Delivery::TurnEnded));

        assert_eq!(effects, vec![Effect::StopSpinner]);
        assert_eq!(state.phase(), UiPhase::Idle);
        assert!(!state.is_streaming());
    }

    #[test]
    fn test_next_turn_opens_new_assistant_message() {
        let mut state = waiting_after("one");
        state.update(token("first"));
        state.update(UiEvent::Delivered(Delivery::TurnEnded));
        state.update(UiEvent::SubmitText("two".to_string()));
        state.update(token("second"));

        let roles: Vec<Role> = state.conversation().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(state.conversation()[3].content, "second");
    }

    #[test]
    fn test_idle_ignores_stray_deliveries() {
        let mut state = UiState::new(80, 24);
        assert!(state.update(token("late")).is_empty());
        assert!(state
            .update(UiEvent::Delivered(Delivery::Activity))
            .is_empty());
        assert!(state.conversation().is_empty());
        assert_eq!(state.phase(), UiPhase::Idle);
    }

    #[test]
    fn test_activity_while_waiting_is_noop() {
        let mut state = waiting_after("q");
        assert!(state
            .update(UiEvent::Delivered(Delivery::Activity))
            .is_empty());
        assert_eq!(state.conversation().len(), 1);
        assert_eq!(state.phase(), UiPhase::Waiting);
    }

    #[test]
    fn test_failed_turn_sets_error_until_next_submit() {
        let mut state = waiting_after("q");
        state.update(UiEvent::Delivered(Delivery::Failed(
            "connection error: refused".to_string(),
        )));
        assert_eq!(state.phase(), UiPhase::Waiting);
        assert_eq!(state.last_error(), Some("connection error: refused"));

        state.update(UiEvent::Delivered(Delivery::TurnEnded));
        assert_eq!(state.phase(), UiPhase::Idle);
        assert_eq!(state.last_error(), Some("connection error: refused"));

        state.update(UiEvent::SubmitText("again".to_string()));
        assert_eq!(state.last_error(), None);
    }

    #[test]
    fn test_stream_closed_ends_turn() {
        let mut state = waiting_after("q");
        let effects = state.update(UiEvent::StreamClosed);
        assert_eq!(effects, vec![Effect::StopSpinner]);
        assert_eq!(state.phase(), UiPhase::Idle);
        assert!(state.stream_closed());
    }

    #[test]
    fn test_ctrl_c_quits_in_any_phase() {
        let mut state = UiState::new(80, 24);
        assert_eq!(state.update(UiEvent::Key(KeyInput::CtrlC)), vec![Effect::Quit]);

        let mut state = waiting_after("q");
        assert_eq!(state.update(UiEvent::Key(KeyInput::CtrlC)), vec![Effect::Quit]);
    }

    #[test]
    fn test_esc_quits_only_when_idle() {
        let mut state = UiState::new(80, 24);
        assert_eq!(state.update(UiEvent::Key(KeyInput::Esc)), vec![Effect::Quit]);

        let mut state = waiting_after("q");
        assert!(state.update(UiEvent::Key(KeyInput::Esc)).is_empty());
    }

    #[test]
    fn test_keys_ignored_while_waiting() {
        let mut state = waiting_after("q");
        state.update(UiEvent::Key(KeyInput::Char('x')));
        state.update(UiEvent::Key(KeyInput::Enter));
        state.update(UiEvent::SubmitText("sneaky".to_string()));

        assert_eq!(state.input(), "");
        assert_eq!(state.conversation().len(), 1);
    }

    #[test]
    fn test_multiline_input() {
        let mut state = UiState::new(80, 24);
        state.update(UiEvent::Key(KeyInput::Char('a')));
        state.update(UiEvent::Key(KeyInput::AltEnter));
        state.update(UiEvent::Key(KeyInput::Char('b')));
        state.update(UiEvent::Key(KeyInput::Char('c')));
        state.update(UiEvent::Key(KeyInput::Backspace));
        assert_eq!(state.input(), "a\nb");
    }

    #[test]
    fn test_spinner_advances_only_while_waiting() {
        let mut state = UiState::new(80, 24);
        state.update(UiEvent::SpinnerTick);
        assert_eq!(state.spinner(), SPINNER_FRAMES[0]);

        let mut state = waiting_after("q");
        state.update(UiEvent::SpinnerTick);
        state.update(UiEvent::SpinnerTick);
        assert_eq!(state.spinner(), SPINNER_FRAMES[2]);
    }

    #[test]
    fn test_scrolling() {
        let mut state = UiState::new(80, 26);
        state.scroll.total_lines = 100;

        // Transcript is 20 rows, half a page is 10
        state.update(UiEvent::Key(KeyInput::PageUp));
        assert_eq!(state.scroll.offset, 10);
        state.update(UiEvent::Scroll(ScrollDirection::Down));
        assert_eq!(state.scroll.offset, 7);
        state.update(UiEvent::Key(KeyInput::Top));
        assert_eq!(state.scroll.offset, 99);
        state.update(UiEvent::Key(KeyInput::Bottom));
        assert_eq!(state.scroll.offset, 0);
        state.update(UiEvent::Scroll(ScrollDirection::Down));
        assert_eq!(state.scroll.offset, 0);
    }

    #[test]
    fn test_token_scrolls_to_bottom() {
        let mut state = waiting_after("q");
        state.scroll.total_lines = 50;
        state.update(UiEvent::Scroll(ScrollDirection::Up));
        assert_eq!(state.scroll.offset, 3);
        state.update(token("more"));
        assert_eq!(state.scroll.offset, 0);
    }

    #[test]
    fn test_resize_changes_page_size() {
        let mut state = UiState::new(80, 24);
        state.update(UiEvent::Resize {
            width: 100,
            height: 46,
        });
        assert_eq!(state.size(), (100, 46));
        state.scroll.total_lines = 100;
        state.update(UiEvent::Key(KeyInput::PageUp));
        assert_eq!(state.scroll.offset, 20);
    }
}
