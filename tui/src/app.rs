//! Main Application
//!
//! The App is a thin adapter around the renderer state machine:
//!
//! 1. Converts terminal events to [`UiEvent`]s
//! 2. Feeds worker deliveries to the state machine as they arrive
//! 3. Carries out the returned [`Effect`]s (queue a turn, spinner, quit)
//! 4. Repaints after every event
//!
//! It never awaits network I/O; turns are handed to the dispatcher task
//! through the turn queue.

use std::time::Duration;

use anyhow::anyhow;
use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::Terminal;
use tokio::time::MissedTickBehavior;

use qcli_engine::delivery::{DeliveryReceiver, TurnSender};
use qcli_engine::Delivery;

use crate::state::{Effect, KeyInput, ScrollDirection, UiEvent, UiPhase, UiState};
use crate::view;

/// Spinner frame interval (10 FPS)
const SPINNER_INTERVAL: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
    /// Renderer state machine
    state: UiState,
    /// Turn queue into the dispatcher
    turns: TurnSender,
    /// Deliveries from the dispatcher
    deliveries: DeliveryReceiver,
    /// Delivery channel still open
    deliveries_open: bool,
    /// Model and protocol shown in the status line
    label: String,
    /// Spinner ticks enabled
    spinner_active: bool,
    /// Is the app still running?
    running: bool,
}

impl App {
    /// Create an app wired to a running dispatcher
    pub fn new(
        turns: TurnSender,
        deliveries: DeliveryReceiver,
        label: impl Into<String>,
        size: (u16, u16),
    ) -> Self {
        Self {
            state: UiState::new(size.0, size.1),
            turns,
            deliveries,
            deliveries_open: true,
            label: label.into(),
            spinner_active: false,
            running: true,
        }
    }

    /// Current renderer state
    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Whether the app wants to keep running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut spinner = tokio::time::interval(SPINNER_INTERVAL);
        spinner.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Render initial frame immediately so user sees UI
        self.render(terminal)?;

        while self.running {
            let event = tokio::select! {
                biased;

                // Terminal events first so Ctrl+C is never starved
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(event)) => translate(event),
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },

                delivery = self.deliveries.recv(), if self.deliveries_open => {
                    Some(self.delivery_event(delivery))
                }

                _ = spinner.tick(), if self.spinner_active => Some(UiEvent::SpinnerTick),
            };

            if let Some(event) = event {
                self.handle(event)?;
                self.render(terminal)?;
            }
        }

        tracing::info!("chat screen closed");
        Ok(())
    }

    /// Apply one event and carry out its effects
    pub fn handle(&mut self, event: UiEvent) -> anyhow::Result<()> {
        for effect in self.state.update(event) {
            match effect {
                Effect::SubmitTurn(text) => {
                    tracing::debug!(chars = text.len(), "submitting turn");
                    self.turns
                        .send(text)
                        .map_err(|_| anyhow!("turn dispatcher has stopped"))?;
                }
                Effect::StartSpinner => self.spinner_active = true,
                Effect::StopSpinner => self.spinner_active = false,
                Effect::Quit => self.running = false,
            }
        }
        Ok(())
    }

    /// Wait for one delivery and apply it
    ///
    /// Returns `false` once the delivery channel has closed.
    pub async fn process_next_delivery(&mut self) -> anyhow::Result<bool> {
        if !self.deliveries_open {
            return Ok(false);
        }
        let delivery = self.deliveries.recv().await;
        let event = self.delivery_event(delivery);
        self.handle(event)?;
        Ok(self.deliveries_open)
    }

    /// Apply deliveries until the current turn is over
    pub async fn wait_for_idle(&mut self) -> anyhow::Result<()> {
        while self.state.phase() == UiPhase::Waiting {
            if !self.process_next_delivery().await? {
                break;
            }
        }
        Ok(())
    }

    fn delivery_event(&mut self, delivery: Option<Delivery>) -> UiEvent {
        match delivery {
            Some(delivery) => UiEvent::Delivered(delivery),
            None => {
                tracing::warn!("delivery channel closed");
                self.deliveries_open = false;
                UiEvent::StreamClosed
            }
        }
    }

    fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        terminal.draw(|frame| view::draw(frame, &mut self.state, &self.label))?;
        Ok(())
    }
}

/// Map a crossterm event onto the state machine's vocabulary
pub fn translate(event: Event) -> Option<UiEvent> {
    match event {
        // Only handle Press events (not Release or Repeat)
        Event::Key(key) if key.kind == KeyEventKind::Press => translate_key(key).map(UiEvent::Key),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => Some(UiEvent::Scroll(ScrollDirection::Up)),
            MouseEventKind::ScrollDown => Some(UiEvent::Scroll(ScrollDirection::Down)),
            _ => None,
        },
        Event::Resize(width, height) => Some(UiEvent::Resize { width, height }),
        _ => None,
    }
}

fn translate_key(key: KeyEvent) -> Option<KeyInput> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let input = match key.code {
        KeyCode::Char('c') if ctrl => KeyInput::CtrlC,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(c) => KeyInput::Char(c),
        KeyCode::Enter if alt => KeyInput::AltEnter,
        KeyCode::Enter => KeyInput::Enter,
        KeyCode::Backspace => KeyInput::Backspace,
        KeyCode::Esc => KeyInput::Esc,
        KeyCode::PageUp => KeyInput::PageUp,
        KeyCode::PageDown => KeyInput::PageDown,
        KeyCode::Home if ctrl => KeyInput::Top,
        KeyCode::End if ctrl => KeyInput::Bottom,
        _ => return None,
    };
    Some(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, MouseEvent};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn test_translate_keys() {
        assert_eq!(
            translate(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(UiEvent::Key(KeyInput::CtrlC))
        );
        assert_eq!(
            translate(key(KeyCode::Enter, KeyModifiers::ALT)),
            Some(UiEvent::Key(KeyInput::AltEnter))
        );
        assert_eq!(
            translate(key(KeyCode::Char('x'), KeyModifiers::SHIFT)),
            Some(UiEvent::Key(KeyInput::Char('x')))
        );
        assert_eq!(
            translate(key(KeyCode::Home, KeyModifiers::CONTROL)),
            Some(UiEvent::Key(KeyInput::Top))
        );
        assert_eq!(translate(key(KeyCode::Char('z'), KeyModifiers::CONTROL)), None);
        assert_eq!(translate(key(KeyCode::F(5), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_translate_release_ignored() {
        let event = Event::Key(KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(translate(event), None);
    }

    #[test]
    fn test_translate_mouse_and_resize() {
        let wheel = Event::Mouse(MouseEvent {
            kind: MouseEventKind::ScrollUp,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(translate(wheel), Some(UiEvent::Scroll(ScrollDirection::Up)));
        assert_eq!(
            translate(Event::Resize(120, 40)),
            Some(UiEvent::Resize {
                width: 120,
                height: 40
            })
        );
    }

    #[test]
    fn test_submit_effect_queues_turn() {
        let (turn_tx, mut turn_rx) = mpsc::unbounded_channel();
        let (_delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let mut app = App::new(turn_tx, delivery_rx, "test", (80, 24));

        app.handle(UiEvent::SubmitText("hello".to_string())).unwrap();

        assert_eq!(turn_rx.try_recv().unwrap(), "hello");
        assert!(app.spinner_active);
        assert_eq!(app.state().phase(), UiPhase::Waiting);
    }

    #[test]
    fn test_submit_fails_when_dispatcher_gone() {
        let (turn_tx, turn_rx) = mpsc::unbounded_channel();
        let (_delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        drop(turn_rx);
        let mut app = App::new(turn_tx, delivery_rx, "test", (80, 24));

        assert!(app.handle(UiEvent::SubmitText("hello".to_string())).is_err());
    }

    #[test]
    fn test_quit_effect_stops_app() {
        let (turn_tx, _turn_rx) = mpsc::unbounded_channel();
        let (_delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let mut app = App::new(turn_tx, delivery_rx, "test", (80, 24));

        app.handle(UiEvent::Key(KeyInput::Esc)).unwrap();
        assert!(!app.is_running());
    }

    #[tokio::test]
    async fn test_closed_delivery_channel_ends_turn() {
        let (turn_tx, _turn_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let mut app = App::new(turn_tx, delivery_rx, "test", (80, 24));

        app.handle(UiEvent::SubmitText("hello".to_string())).unwrap();
        drop(delivery_tx);
        app.wait_for_idle().await.unwrap();

        assert_eq!(app.state().phase(), UiPhase::Idle);
        assert!(app.state().stream_closed());
        assert!(!app.spinner_active);
        assert!(!app.process_next_delivery().await.unwrap());
    }
}
