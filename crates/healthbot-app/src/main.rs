//! Healthbot application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing (stderr, so logs never mix with the transcript)
//! 3. Run either the terminal conversation (`chat`) or the analysis
//!    backend (`serve`)

mod cli;
mod repl;

use std::sync::Arc;

use clap::Parser;

use healthbot_api::{create_router, AppState};
use healthbot_chat::{HttpBackend, SessionController, TerminalRenderer, TerminalStatusLine};
use healthbot_core::config::FeedbackConfig;
use healthbot_core::HealthbotConfig;
use healthbot_feedback::FeedbackEmitter;
use healthbot_speech::{CommandRecognizer, CommandSynthesizer};

use cli::{CliArgs, Command};

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Tones through the default output device, or silence when there is none.
fn build_feedback(config: &FeedbackConfig, no_sound: bool) -> FeedbackEmitter {
    if no_sound || !config.enabled {
        return FeedbackEmitter::silent();
    }

    #[cfg(feature = "playback")]
    {
        match healthbot_feedback::playback::CpalToneSink::open() {
            Ok(sink) => FeedbackEmitter::new(Arc::new(sink), config),
            Err(e) => {
                tracing::info!(error = %e, "No audio output; tones disabled");
                FeedbackEmitter::silent()
            }
        }
    }

    #[cfg(not(feature = "playback"))]
    {
        tracing::debug!("Built without audio playback; tones disabled");
        FeedbackEmitter::silent()
    }
}

async fn run_chat(
    config: HealthbotConfig,
    backend_url: Option<String>,
    no_sound: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut backend_config = config.backend.clone();
    backend_config.base_url = cli::resolve_backend_url(backend_url.as_deref(), &backend_config.base_url);
    let backend = HttpBackend::from_config(&backend_config)?;
    tracing::info!(url = %backend.base_url(), "Using analysis backend");

    let recognizer = Arc::new(CommandRecognizer::from_config(&config.speech_input));
    let synthesizer = Arc::new(CommandSynthesizer::from_config(&config.speech_output));
    let renderer = Arc::new(TerminalRenderer::new(std::io::stdout()));
    let status = Arc::new(TerminalStatusLine::new(std::io::stderr()));

    let controller = SessionController::new(Arc::new(backend.clone()), renderer, status.clone())
        .with_recognizer(recognizer)
        .with_synthesizer(synthesizer)
        .with_feedback(build_feedback(&config.feedback, no_sound));

    repl::run(Arc::new(controller), status, backend).await?;
    Ok(())
}

async fn run_server(
    config: HealthbotConfig,
    host: Option<String>,
    port: Option<u16>,
    history_file: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host);
    let port = cli::resolve_port(port, config.server.port);
    let history_file = history_file.unwrap_or(config.server.history_file);

    let state = AppState::from_history_file(&history_file);
    let router = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind; is another instance running?");
            tracing::error!("Try: healthbot serve --port {}", port.saturating_add(1));
            return Err(e.into());
        }
    };

    tracing::info!(addr = %addr, "Analysis backend listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await?;
    tracing::info!("Analysis backend stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first: its log level feeds the tracing filter.
    let config_path = args.resolve_config_path();
    let loaded = HealthbotConfig::load(&config_path);
    let config_level = loaded
        .as_ref()
        .map(|c| c.general.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&args.resolve_log_level(&config_level));

    tracing::info!("Starting Healthbot v{}", env!("CARGO_PKG_VERSION"));
    let config = match loaded {
        Ok(config) => {
            tracing::info!(path = %config_path.display(), "Configuration loaded");
            config
        }
        Err(e) if config_path.exists() => {
            tracing::warn!(path = %config_path.display(), error = %e, "Invalid configuration, using defaults");
            HealthbotConfig::default()
        }
        Err(_) => {
            tracing::debug!(path = %config_path.display(), "No configuration file, using defaults");
            HealthbotConfig::default()
        }
    };

    match args.command() {
        Command::Chat {
            backend_url,
            no_sound,
        } => run_chat(config, backend_url, no_sound).await,
        Command::Serve {
            host,
            port,
            history_file,
        } => run_server(config, host, port, history_file).await,
    }
}
