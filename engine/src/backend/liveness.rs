//! Backend Liveness
//!
//! The engine assumes a model server is listening before the first turn.
//! [`BackendLiveness`] is the contract the entry point consults for that;
//! [`OllamaProcess`] implements it for a local `ollama serve`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::error::{EngineError, Result};

/// Whether the backend is up, and how to bring it up or down
#[async_trait]
pub trait BackendLiveness: Send {
    /// Check if the backend answers HTTP requests
    async fn is_running(&self) -> bool;

    /// Start the backend and wait until it answers
    async fn start(&mut self) -> Result<()>;

    /// Stop the backend if this process started it
    async fn stop(&mut self) -> Result<()>;
}

/// A local `ollama serve` process
pub struct OllamaProcess {
    /// Server root URL probed for liveness
    base_url: String,
    /// HTTP client for probes
    http_client: reqwest::Client,
    /// Child handle when we spawned the server ourselves
    child: Option<Child>,
    /// Whether this process started the server
    started_by_us: bool,
    /// Readiness polls after spawning
    startup_attempts: u32,
    /// Delay between readiness polls
    startup_interval: Duration,
}

impl OllamaProcess {
    /// Create a liveness checker for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| EngineError::Connection(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            http_client,
            child: None,
            started_by_us: false,
            startup_attempts: 10,
            startup_interval: Duration::from_secs(1),
        })
    }

    /// Override the readiness polling schedule
    #[must_use]
    pub fn with_startup_schedule(mut self, attempts: u32, interval: Duration) -> Self {
        self.startup_attempts = attempts;
        self.startup_interval = interval;
        self
    }

    /// Whether this process started the server
    #[must_use]
    pub fn started_by_us(&self) -> bool {
        self.started_by_us
    }

    /// Locate the `ollama` executable on `PATH`
    #[must_use]
    pub fn installed_binary() -> Option<PathBuf> {
        which::which("ollama").ok()
    }

    /// Installation hint for the current platform
    #[must_use]
    pub fn install_hint() -> &'static str {
        if cfg!(windows) {
            "To install Ollama on Windows, visit https://ollama.ai for installation instructions"
        } else {
            "To install Ollama, run: curl https://ollama.ai/install.sh | sh"
        }
    }

    /// Kill every running server, whoever started it
    pub async fn kill_all(&mut self) -> Result<()> {
        let mut command = if cfg!(windows) {
            let mut c = Command::new("taskkill");
            c.args(["/F", "/IM", "ollama.exe"]);
            c
        } else {
            let mut c = Command::new("pkill");
            c.arg("ollama");
            c
        };

        let status = command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| EngineError::Liveness(format!("failed to stop Ollama server: {e}")))?;

        if !status.success() {
            return Err(EngineError::Liveness(format!(
                "failed to stop Ollama server: {status}"
            )));
        }

        self.child = None;
        self.started_by_us = false;
        Ok(())
    }

    /// Spawn the server and poll until it answers
    ///
    /// A server that never becomes ready is killed before the error is
    /// returned, so nothing outlives a failed start.
    async fn launch(&mut self, mut command: Command) -> Result<()> {
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Liveness(format!("failed to start Ollama server: {e}")))?;
        self.child = Some(child);

        for attempt in 1..=self.startup_attempts {
            if self.is_running().await {
                tracing::info!(attempt, "ollama server is up");
                self.started_by_us = true;
                return Ok(());
            }
            tokio::time::sleep(self.startup_interval).await;
        }

        tracing::warn!(
            attempts = self.startup_attempts,
            "ollama server never answered, killing it"
        );
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "failed to kill unready ollama server");
            }
        }

        Err(EngineError::Liveness(
            "ollama server did not start within the expected time".to_string(),
        ))
    }
}

#[async_trait]
impl BackendLiveness for OllamaProcess {
    async fn is_running(&self) -> bool {
        self.http_client.get(&self.base_url).send().await.is_ok()
    }

    async fn start(&mut self) -> Result<()> {
        let binary = Self::installed_binary().ok_or_else(|| {
            EngineError::Liveness(format!(
                "ollama is not installed. {}",
                Self::install_hint()
            ))
        })?;

        tracing::info!(binary = %binary.display(), "starting ollama serve");
        let mut command = Command::new(binary);
        command.arg("serve");
        self.launch(command).await
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.started_by_us {
            return Ok(());
        }

        tracing::info!("stopping ollama server we started");
        match self.child.take() {
            Some(mut child) => {
                child
                    .kill()
                    .await
                    .map_err(|e| EngineError::Liveness(format!("failed to stop Ollama server: {e}")))?;
                self.started_by_us = false;
                Ok(())
            }
            None => self.kill_all().await,
        }
    }
}
