//! qcli TUI - Terminal chat surface
//!
//! A full-screen chat screen over the headless `qcli-engine` crate.
//!
//! # Architecture
//!
//! - **State**: pure renderer state machine (`UiState::update`)
//! - **App**: crossterm event loop that feeds the state machine and
//!   executes its effects
//! - **View**: ratatui painting of the transcript, input box and status line
//! - **Widgets**: borderless scrollable transcript

pub mod app;
pub mod state;
pub mod theme;
pub mod view;
pub mod widgets;

pub use app::App;
pub use state::{Effect, UiEvent, UiPhase, UiState};
