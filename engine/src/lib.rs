//! qcli Engine - Headless Streaming Conversation Core
//!
//! This crate holds everything between the user's submitted text and the
//! tokens the terminal shows, with no terminal dependency at all. The TUI
//! crate drives it through two channels; tests drive it through a scripted
//! [`backend::ChatTransport`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  turn (String)   ┌──────────────┐   HTTP   ┌──────────┐
//! │   Renderer   │ ───────────────▶ │  Dispatcher  │ ───────▶ │  Model   │
//! │  (UI task)   │ ◀─────────────── │   + Engine   │ ◀─────── │ backend  │
//! └──────────────┘    Delivery      └──────┬───────┘  bytes   └──────────┘
//!                                          │
//!                               BodyDecoder → SectionClassifier
//! ```
//!
//! # Key Types
//!
//! - [`Engine`]: runs one turn in direct or reasoning mode
//! - [`SectionClassifier`]: character scanner that hides `THINKING:` sections
//! - [`Delivery`]: what crosses from the worker to the renderer
//! - [`EngineConfig`]: layered configuration (file, environment, CLI)
//! - [`EngineError`]: every failure of a backend call
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use qcli_engine::{backend::HttpTransport, delivery, load_config, Engine};
//!
//! let config = load_config()?;
//! let transport = Arc::new(HttpTransport::from_config(&config)?);
//! let engine = Arc::new(Engine::new(transport, config));
//!
//! let mut handle = delivery::spawn_dispatcher(engine);
//! handle.turns.send("2+2?".to_string())?;
//! while let Some(item) = handle.deliveries.recv().await {
//!     // Token, Activity, Failed, TurnEnded
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod classifier;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod reasoning;

pub use classifier::{classify, SectionClassifier, StreamEvent, THINKING_SECTION};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, EngineConfig, Protocol, ReasoningPolicy,
};
pub use delivery::{run_dispatcher, spawn_dispatcher, Delivery, DispatcherHandle};
pub use engine::Engine;
pub use error::{EngineError, Result};
