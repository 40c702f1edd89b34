//! TOML Configuration File Support
//!
//! Engine configuration is assembled from several layers, highest priority
//! first:
//!
//! 1. CLI arguments ([`ConfigOverrides`], applied by the caller)
//! 2. Environment variables
//! 3. TOML configuration file (`$XDG_CONFIG_HOME/qcli/config.toml`)
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:11434"
//! model = "llama3.2"
//! protocol = "reasoning"      # or "direct"
//! direct_path = "/chat/stream"
//! body_format = "raw"         # or "ndjson"
//! request_timeout_secs = 120
//! auto_start = false
//!
//! [engine]
//! max_tokens = 1024
//! show_headers = false
//! suppressed_sections = ["THINKING"]
//!
//! [reasoning]
//! max_rounds = 10
//! max_attempts_per_round = 3
//! temperature = 0.2
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BodyFormat;
use crate::classifier::THINKING_SECTION;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Protocol Selection
// =============================================================================

/// Which conversation protocol the backend speaks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// One streaming POST of `{message}`, body run through the classifier
    Direct,
    /// Bounded JSON reasoning rounds, then a streamed final answer
    #[default]
    Reasoning,
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "reasoning" | "cot" => Ok(Self::Reasoning),
            other => Err(format!(
                "unknown protocol '{other}' (expected direct or reasoning)"
            )),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Reasoning => write!(f, "reasoning"),
        }
    }
}

/// Bounds of the multi-round reasoning exchange
#[derive(Clone, Debug, PartialEq)]
pub struct ReasoningPolicy {
    /// Maximum reasoning rounds before forcing the final answer
    pub max_rounds: u32,
    /// Requests per round before giving up on a malformed response
    pub max_attempts_per_round: u32,
    /// Sampling temperature for rounds and the final answer
    pub temperature: f32,
}

impl Default for ReasoningPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            max_attempts_per_round: 3,
            temperature: 0.2,
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Backend root URL
    pub base_url: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Conversation protocol
    pub protocol: Option<Protocol>,
    /// Endpoint path for the direct protocol
    pub direct_path: Option<String>,
    /// Body encoding for the direct protocol
    pub body_format: Option<BodyFormat>,
    /// Connect and read-idle timeout in seconds
    pub request_timeout_secs: Option<u64>,
    /// Start `ollama serve` when the backend is down
    pub auto_start: Option<bool>,
}

/// Engine section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineToml {
    /// Maximum tokens per response
    pub max_tokens: Option<u32>,
    /// Forward section headers to the transcript
    pub show_headers: Option<bool>,
    /// Section names whose content is hidden
    pub suppressed_sections: Option<Vec<String>>,
}

/// Reasoning section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningToml {
    /// Maximum reasoning rounds
    pub max_rounds: Option<u32>,
    /// Attempts per round
    pub max_attempts_per_round: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QcliToml {
    /// Backend section
    pub backend: BackendToml,
    /// Engine section
    pub engine: EngineToml,
    /// Reasoning section
    pub reasoning: ReasoningToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Backend root URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Conversation protocol
    pub protocol: Protocol,
    /// Endpoint path for the direct protocol
    pub direct_path: String,
    /// Chat completion endpoint path
    pub chat_path: String,
    /// Body encoding for the direct protocol
    pub body_format: BodyFormat,
    /// Connect timeout and longest silence allowed between body reads
    ///
    /// A streamed answer may take longer than this overall.
    pub request_timeout: Duration,
    /// Start the backend when it is down
    pub auto_start: bool,
    /// Maximum tokens per response (`num_predict`)
    pub max_tokens: u32,
    /// Forward section headers as formatted lines
    pub show_headers: bool,
    /// Section names whose content is hidden
    pub suppressed_sections: Vec<String>,
    /// Reasoning bounds
    pub reasoning: ReasoningPolicy,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Highest-priority layer that contributed a value
    ///
    /// Set by the loaders. Hand-built configs keep whatever they were given.
    pub source: ConfigSource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            protocol: Protocol::default(),
            direct_path: "/chat/stream".to_string(),
            chat_path: "/api/chat".to_string(),
            body_format: BodyFormat::default(),
            request_timeout: Duration::from_secs(120),
            auto_start: false,
            max_tokens: 1024,
            show_headers: false,
            suppressed_sections: vec![THINKING_SECTION.to_string()],
            reasoning: ReasoningPolicy::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl EngineConfig {
    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model must not be empty".to_string(),
            ));
        }
        if self.reasoning.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "reasoning.max_rounds must be at least 1".to_string(),
            ));
        }
        if self.reasoning.max_attempts_per_round == 0 {
            return Err(ConfigError::ValidationError(
                "reasoning.max_attempts_per_round must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.reasoning.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "reasoning.temperature must be within 0.0..=2.0, got {}",
                self.reasoning.temperature
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/qcli/config.toml` or
/// `~/.config/qcli/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("qcli").join("config.toml"))
}

/// Load configuration from the default path plus environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path plus environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<EngineConfig, ConfigError> {
    let mut config = load_file_layer(path)?;
    apply_env_config(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Defaults plus the TOML file, without environment
fn load_file_layer(path: Option<PathBuf>) -> Result<EngineConfig, ConfigError> {
    let mut config = EngineConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: QcliToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut EngineConfig, toml: &QcliToml) {
    // Backend settings
    if let Some(ref url) = toml.backend.base_url {
        config.base_url = url.clone();
    }
    if let Some(ref model) = toml.backend.model {
        config.model = model.clone();
    }
    if let Some(protocol) = toml.backend.protocol {
        config.protocol = protocol;
    }
    if let Some(ref path) = toml.backend.direct_path {
        config.direct_path = path.clone();
    }
    if let Some(format) = toml.backend.body_format {
        config.body_format = format;
    }
    if let Some(secs) = toml.backend.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(auto_start) = toml.backend.auto_start {
        config.auto_start = auto_start;
    }

    // Engine settings
    if let Some(max_tokens) = toml.engine.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(show) = toml.engine.show_headers {
        config.show_headers = show;
    }
    if let Some(ref sections) = toml.engine.suppressed_sections {
        config.suppressed_sections = sections.clone();
    }

    // Reasoning settings
    if let Some(rounds) = toml.reasoning.max_rounds {
        config.reasoning.max_rounds = rounds;
    }
    if let Some(attempts) = toml.reasoning.max_attempts_per_round {
        config.reasoning.max_attempts_per_round = attempts;
    }
    if let Some(temperature) = toml.reasoning.temperature {
        config.reasoning.temperature = temperature;
    }
}

/// Apply environment variable overrides to the config
///
/// `lookup` resolves a variable name; unparsable values are ignored.
fn apply_env_config<F>(config: &mut EngineConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // OLLAMA_HOST is the server's own convention (host[:port] or URL)
    if let Some(host) = lookup("OLLAMA_HOST") {
        config.base_url = if host.contains("://") {
            host
        } else if host.contains(':') {
            format!("http://{host}")
        } else {
            format!("http://{host}:11434")
        };
        config.source = ConfigSource::Env;
    }
    if let Some(url) = lookup("QCLI_BASE_URL") {
        config.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(model) = lookup("QCLI_MODEL") {
        config.model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(protocol) = lookup("QCLI_PROTOCOL") {
        if let Ok(p) = protocol.parse() {
            config.protocol = p;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(max_tokens) = lookup("QCLI_MAX_TOKENS") {
        if let Ok(n) = max_tokens.parse() {
            config.max_tokens = n;
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Base URL override
    pub base_url: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Protocol override
    pub protocol: Option<Protocol>,
    /// Max tokens override
    pub max_tokens: Option<u32>,
    /// Auto-start override
    pub auto_start: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set protocol override
    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Set max tokens override
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set auto-start override
    #[must_use]
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = Some(auto_start);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none()
            && self.model.is_none()
            && self.protocol.is_none()
            && self.max_tokens.is_none()
            && self.auto_start.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(ref url) = self.base_url {
            config.base_url = url.clone();
        }
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if let Some(protocol) = self.protocol {
            config.protocol = protocol;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(auto_start) = self.auto_start {
            config.auto_start = auto_start;
        }
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }
    }
}
