//! Custom widgets

pub mod transcript;

pub use transcript::Transcript;
