//! CLI argument definitions for the Healthbot application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Healthbot - a symptom-checking conversational assistant.
#[derive(Parser, Debug)]
#[command(name = "healthbot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Talk to the assistant in the terminal (default).
    Chat {
        /// Base URL of the analysis backend.
        #[arg(short = 'b', long = "backend-url")]
        backend_url: Option<String>,

        /// Disable the message tones.
        #[arg(long = "no-sound")]
        no_sound: bool,
    },
    /// Run the analysis backend.
    Serve {
        /// Address to bind.
        #[arg(long = "host")]
        host: Option<String>,

        /// Port to listen on.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// JSON file for conversation history. Empty keeps history in memory.
        #[arg(long = "history-file")]
        history_file: Option<String>,
    },
}

impl CliArgs {
    /// The subcommand to run; `chat` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat {
            backend_url: None,
            no_sound: false,
        })
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > HEALTHBOT_CONFIG env var > ~/.healthbot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("HEALTHBOT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Resolve the backend base URL.
///
/// Priority: --backend-url flag > HEALTHBOT_BACKEND_URL env var > config file value.
pub fn resolve_backend_url(flag: Option<&str>, config_url: &str) -> String {
    if let Some(url) = flag {
        return url.to_string();
    }
    if let Ok(url) = std::env::var("HEALTHBOT_BACKEND_URL") {
        if !url.trim().is_empty() {
            return url;
        }
    }
    config_url.to_string()
}

/// Resolve the server port.
///
/// Priority: --port flag > HEALTHBOT_PORT env var > config file value > 5000.
pub fn resolve_port(flag: Option<u16>, config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    if let Ok(val) = std::env::var("HEALTHBOT_PORT") {
        if let Ok(p) = val.parse::<u16>() {
            return p;
        }
    }
    if config_port != 0 {
        return config_port;
    }
    5000
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".healthbot").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".healthbot").join("config.toml");
    }
    PathBuf::from("config.toml")
}
