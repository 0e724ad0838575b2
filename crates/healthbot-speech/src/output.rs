//! Speech output: best-effort vocalization of text.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use healthbot_core::config::SpeechOutputConfig;

use crate::command::{expand_args, resolve_program};
use crate::error::SpeechError;

/// Normal speaking pace, in words per minute, that `rate` scales.
pub const BASE_WORDS_PER_MINUTE: f64 = 175.0;

/// Host text-to-speech capability.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether the host can speak at all.
    fn is_available(&self) -> bool;

    /// Speak `text`. Concurrent calls queue behind each other.
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Words per minute for a relative speaking `rate`.
pub fn words_per_minute(rate: f32) -> u32 {
    let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
    (BASE_WORDS_PER_MINUTE * f64::from(rate)).round() as u32
}

// =============================================================================
// Unavailable
// =============================================================================

/// Stand-in for hosts without speech synthesis.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSynthesizer;

#[async_trait]
impl SpeechSynthesizer for UnavailableSynthesizer {
    fn is_available(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable(
            "speech synthesis is not supported on this host".to_string(),
        ))
    }
}

// =============================================================================
// Command-backed synthesizer
// =============================================================================

/// Synthesizer that pipes each utterance into an external program.
///
/// Utterances are spoken one at a time in call order.
#[derive(Debug)]
pub struct CommandSynthesizer {
    program: Option<PathBuf>,
    args: Vec<String>,
    queue: tokio::sync::Mutex<()>,
}

impl CommandSynthesizer {
    pub fn new(program: &str, args: &[String], rate: f32) -> Self {
        let resolved = resolve_program(program);
        if resolved.is_none() && !program.trim().is_empty() {
            tracing::warn!(program = %program, "Speech synthesizer not found; speech output disabled");
        }
        let wpm = words_per_minute(rate);
        Self {
            program: resolved,
            args: expand_args(args, &[("wpm", wpm.to_string())]),
            queue: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_config(config: &SpeechOutputConfig) -> Self {
        Self::new(&config.command, &config.args, config.rate)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let program = self.program.as_ref().ok_or_else(|| {
            SpeechError::Unavailable("no speech synthesizer configured".to_string())
        })?;

        let _turn = self.queue.lock().await;
        tracing::debug!(chars = text.len(), "Speaking");

        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SpeechError::Synthesis(format!(
                "{}: {}",
                output.status, stderr
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Recording implementation
// =============================================================================

/// Synthesizer that records utterances instead of speaking them.
#[derive(Debug, Default)]
pub struct RecordingSynthesizer {
    spoken: Mutex<Vec<String>>,
    unavailable: bool,
    failing: bool,
}

impl RecordingSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Available, but every `speak` fails after recording the text.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        if self.unavailable {
            return Err(SpeechError::Unavailable("recording".to_string()));
        }
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
        if self.failing {
            return Err(SpeechError::Synthesis("recording failure".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
