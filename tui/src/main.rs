//! qcli Entry Point
//!
//! Chat with a locally hosted language model from the terminal.
//!
//! Usage:
//!   qcli [chat] [OPTIONS]   Open the chat screen (default)
//!   qcli stop               Stop the local Ollama server
//!
//! Options:
//!   --config <PATH>         Config file (default: ~/.config/qcli/config.toml)
//!   --base-url <URL>        Backend root URL
//!   --model <NAME>          Model identifier
//!   --protocol <PROTOCOL>   direct | reasoning
//!   --max-tokens <N>        Maximum tokens per response
//!   --start-backend         Start `ollama serve` if it is not running

use std::io::{self, IsTerminal};
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qcli_engine::backend::{BackendLiveness, HttpTransport, OllamaProcess};
use qcli_engine::{
    load_config_from_path, spawn_dispatcher, ConfigOverrides, DispatcherHandle, Engine,
    EngineConfig, Protocol,
};
use qcli_tui::App;

#[derive(Debug, Parser)]
#[command(name = "qcli", version, about = "Chat with a local language model")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backend root URL
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Model identifier
    #[arg(long, global = true)]
    model: Option<String>,

    /// Conversation protocol (direct or reasoning)
    #[arg(long, global = true)]
    protocol: Option<Protocol>,

    /// Maximum tokens per response
    #[arg(long, global = true, value_name = "N")]
    max_tokens: Option<u32>,

    /// Start `ollama serve` if the backend is not running
    #[arg(long, global = true)]
    start_backend: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Open the chat screen
    Chat,
    /// Stop the local Ollama server
    Stop,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref url) = self.base_url {
            overrides = overrides.with_base_url(url);
        }
        if let Some(ref model) = self.model {
            overrides = overrides.with_model(model);
        }
        if let Some(protocol) = self.protocol {
            overrides = overrides.with_protocol(protocol);
        }
        if let Some(max_tokens) = self.max_tokens {
            overrides = overrides.with_max_tokens(max_tokens);
        }
        if self.start_backend {
            overrides = overrides.with_auto_start(true);
        }
        overrides
    }

    fn load_config(&self) -> anyhow::Result<EngineConfig> {
        let path = match self.config {
            Some(ref path) if !path.exists() => {
                bail!("config file not found: {}", path.display())
            }
            Some(ref path) => Some(path.clone()),
            None => qcli_engine::default_config_path(),
        };

        let mut config = load_config_from_path(path)?;
        self.overrides().apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging()?;

    let config = cli.load_config()?;
    tracing::info!(
        base_url = %config.base_url,
        model = %config.model,
        protocol = %config.protocol,
        source = %config.source,
        log = %log_path.display(),
        "configuration loaded"
    );

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(config).await,
        Command::Stop => stop(&config).await,
    }
}

/// Log to a file; the terminal belongs to the chat screen
fn init_logging() -> anyhow::Result<PathBuf> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("qcli");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let path = dir.join("qcli.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    Ok(path)
}

async fn chat(config: EngineConfig) -> anyhow::Result<()> {
    // Check if we have a TTY before attempting initialization
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: qcli requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means stdin or stdout is piped, or SSH was run without -t.");
        std::process::exit(1);
    }

    let mut backend = OllamaProcess::new(config.base_url.clone())?;
    ensure_backend(&mut backend, &config).await?;

    let label = format!("{} ({})", config.model, config.protocol);
    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let engine = Arc::new(Engine::new(transport, config));
    let DispatcherHandle {
        turns,
        deliveries,
        task,
    } = spawn_dispatcher(engine);

    let size = crossterm::terminal::size()?;
    let mut app = App::new(turns, deliveries, label, size);
    let result = run_terminal(&mut app).await;

    task.abort();
    if let Err(e) = backend.stop().await {
        tracing::warn!(error = %e, "failed to stop backend");
        eprintln!("Warning: {e}");
    }

    result
}

/// Make sure the backend answers, starting it if allowed
async fn ensure_backend(backend: &mut OllamaProcess, config: &EngineConfig) -> anyhow::Result<()> {
    if backend.is_running().await {
        return Ok(());
    }

    if !config.auto_start {
        bail!(
            "no model backend is answering at {}. Start it with `ollama serve`, \
             or pass --start-backend",
            config.base_url
        );
    }

    eprintln!("Starting Ollama server...");
    backend.start().await?;
    eprintln!("Ollama server started.");
    Ok(())
}

async fn stop(config: &EngineConfig) -> anyhow::Result<()> {
    let mut backend = OllamaProcess::new(config.base_url.clone())?;
    backend.kill_all().await?;
    println!("Ollama server stopped.");
    Ok(())
}

async fn run_terminal(app: &mut App) -> anyhow::Result<()> {
    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}
