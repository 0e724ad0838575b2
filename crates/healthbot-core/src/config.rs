use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HealthbotError, Result};

/// Top-level configuration for the Healthbot client and backend.
///
/// Loaded from `~/.healthbot/config.toml` by default. Every section falls
/// back to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthbotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub speech_input: SpeechInputConfig,
    #[serde(default)]
    pub speech_output: SpeechOutputConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl HealthbotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HealthbotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| HealthbotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Where the analysis backend lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; `/api/healthbot`, `/api/reset` and `/api/history` are appended.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Speech-to-text capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechInputConfig {
    /// Recognizer program. Empty means the capability is absent.
    pub command: String,
    /// Arguments passed to the recognizer. `{locale}` is substituted.
    pub args: Vec<String>,
    /// Recognition locale.
    pub locale: String,
    /// Give up on a listen after this many seconds.
    pub timeout_secs: u64,
}

impl Default for SpeechInputConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: vec!["--lang".to_string(), "{locale}".to_string()],
            locale: "en-US".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Text-to-speech capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechOutputConfig {
    /// Synthesizer program; the utterance is written to its stdin.
    pub command: String,
    /// Arguments passed to the synthesizer. `{wpm}` is substituted.
    pub args: Vec<String>,
    /// Speaking rate relative to the synthesizer's normal pace.
    pub rate: f32,
}

impl Default for SpeechOutputConfig {
    fn default() -> Self {
        Self {
            command: "espeak".to_string(),
            args: vec!["-s".to_string(), "{wpm}".to_string()],
            rate: 1.02,
        }
    }
}

/// UI feedback tones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub enabled: bool,
    /// Linear gain applied to every tone (0.0 to 1.0).
    pub volume: f32,
    pub user_tone_hz: f32,
    pub user_tone_ms: u64,
    pub bot_tone_hz: f32,
    pub bot_tone_ms: u64,
    /// Oscillator shape: sine, square, triangle or sawtooth.
    pub waveform: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.02,
            user_tone_hz: 820.0,
            user_tone_ms: 50,
            bot_tone_hz: 520.0,
            bot_tone_ms: 60,
            waveform: "sine".to_string(),
        }
    }
}

/// Backend server settings used by `healthbot serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON file mirroring the conversation history. Empty keeps it in memory.
    pub history_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            history_file: "local_data/history.json".to_string(),
        }
    }
}
