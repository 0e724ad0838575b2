//! Speech input: single-shot recognition of one utterance.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::oneshot;

use healthbot_core::config::SpeechInputConfig;

use crate::command::{expand_args, resolve_program};
use crate::error::SpeechError;

/// Host speech-to-text capability.
///
/// `listen_once` produces exactly one outcome: the recognized utterance or
/// an error. Only one listen may be outstanding at a time; callers are
/// expected to guard against overlap.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Whether the host offers speech recognition at all.
    fn is_available(&self) -> bool;

    /// Listen for a single utterance and return its best transcript.
    async fn listen_once(&self) -> Result<String, SpeechError>;
}

/// Recognition parameters shared by every recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerSettings {
    /// Single recognition locale, e.g. "en-US".
    pub locale: String,
    /// Stop listening after this long without a result.
    pub timeout: Duration,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl From<&SpeechInputConfig> for RecognizerSettings {
    fn from(config: &SpeechInputConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

/// Pick the first non-empty line of recognizer output.
fn first_alternative(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unavailable
// =============================================================================

/// Stand-in for hosts without speech recognition.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRecognizer;

#[async_trait]
impl SpeechRecognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    async fn listen_once(&self) -> Result<String, SpeechError> {
        Err(SpeechError::Unavailable(
            "speech recognition is not supported on this host".to_string(),
        ))
    }
}

// =============================================================================
// Command-backed recognizer
// =============================================================================

/// Recognizer that runs an external program once per utterance.
///
/// The program is expected to capture one phrase and print its transcript
/// on stdout. Anything after the first non-empty line is ignored.
#[derive(Debug)]
pub struct CommandRecognizer {
    program: Option<PathBuf>,
    args: Vec<String>,
    settings: RecognizerSettings,
    listening: AtomicBool,
}

/// Clears the listening flag when a listen ends, however it ends.
struct ListenGuard<'a>(&'a AtomicBool);

impl Drop for ListenGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CommandRecognizer {
    pub fn new(program: &str, args: Vec<String>, settings: RecognizerSettings) -> Self {
        let resolved = resolve_program(program);
        if resolved.is_none() && !program.trim().is_empty() {
            tracing::warn!(program = %program, "Speech recognizer not found; voice input disabled");
        }
        Self {
            program: resolved,
            args,
            settings,
            listening: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &SpeechInputConfig) -> Self {
        Self::new(&config.command, config.args.clone(), config.into())
    }

    pub fn settings(&self) -> &RecognizerSettings {
        &self.settings
    }
}

#[async_trait]
impl SpeechRecognizer for CommandRecognizer {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    async fn listen_once(&self) -> Result<String, SpeechError> {
        let program = self.program.as_ref().ok_or_else(|| {
            SpeechError::Unavailable("no speech recognizer configured".to_string())
        })?;

        if self.listening.swap(true, Ordering::AcqRel) {
            return Err(SpeechError::Busy);
        }
        let _guard = ListenGuard(&self.listening);

        let args = expand_args(&self.args, &[("locale", self.settings.locale.clone())]);
        tracing::debug!(program = %program.display(), locale = %self.settings.locale, "Listening");

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.settings.timeout, child.wait_with_output())
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(SpeechError::Timeout(self.settings.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SpeechError::Recognition(format!(
                "{}: {}",
                output.status, stderr
            )));
        }

        let transcript =
            first_alternative(&String::from_utf8_lossy(&output.stdout)).ok_or(SpeechError::NoSpeech)?;
        tracing::info!(chars = transcript.len(), "Utterance recognized");
        Ok(transcript)
    }
}

// =============================================================================
// Scripted implementation
// =============================================================================

enum Scripted {
    Ready(Result<String, SpeechError>),
    Deferred(oneshot::Receiver<Result<String, SpeechError>>),
}

/// Recognizer that replays queued outcomes, for tests and demos.
///
/// An empty script yields `NoSpeech`. Deferred entries stay pending until
/// their sender fires, which lets callers observe the listening phase.
#[derive(Default)]
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Scripted>>,
    unavailable: bool,
    listens: AtomicUsize,
}

impl std::fmt::Debug for ScriptedRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRecognizer")
            .field("unavailable", &self.unavailable)
            .field("listens", &self.listens.load(Ordering::Relaxed))
            .finish()
    }
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recognizer that reports the capability as missing.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn push_utterance(&self, text: impl Into<String>) {
        self.push(Scripted::Ready(Ok(text.into())));
    }

    pub fn push_error(&self, error: SpeechError) {
        self.push(Scripted::Ready(Err(error)));
    }

    /// Queue an outcome supplied later through the returned sender.
    pub fn push_deferred(&self) -> oneshot::Sender<Result<String, SpeechError>> {
        let (tx, rx) = oneshot::channel();
        self.push(Scripted::Deferred(rx));
        tx
    }

    /// Number of `listen_once` calls made so far.
    pub fn listen_count(&self) -> usize {
        self.listens.load(Ordering::Relaxed)
    }

    fn push(&self, entry: Scripted) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn listen_once(&self) -> Result<String, SpeechError> {
        self.listens.fetch_add(1, Ordering::Relaxed);
        if self.unavailable {
            return Err(SpeechError::Unavailable("scripted".to_string()));
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Deferred(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(SpeechError::Recognition("listen abandoned".to_string()))),
            None => Err(SpeechError::NoSpeech),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
