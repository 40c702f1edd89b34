//! Theme and Colors
//!
//! A small fixed palette for the chat screen.

use ratatui::style::Color;

// ============================================================================
// Transcript
// ============================================================================

/// User message text
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// Assistant message text
pub const ASSISTANT_VIOLET: Color = Color::Rgb(175, 135, 255);

/// Placeholder and "Thinking..." line
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Spinner glyph
pub const SPINNER_TEAL: Color = Color::Rgb(0, 175, 135);

// ============================================================================
// Input and Status
// ============================================================================

/// Separator above the input box
pub const SEPARATOR: Color = Color::DarkGray;

/// Input box while a turn is in flight
pub const INPUT_DISABLED: Color = Color::Rgb(88, 88, 88);

/// Failed turn in the status line
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Overflow marker when the input is taller than its box
pub const OVERFLOW_YELLOW: Color = Color::Yellow;
