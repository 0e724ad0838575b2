//! Healthbot Feedback crate - short synthetic tones for conversation events.
//!
//! Tones are synthesized in memory and handed to a `ToneSink`. The emitter
//! never reports failures to its caller: a missing or broken sink simply
//! means silence.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use healthbot_core::config::FeedbackConfig;
use healthbot_core::types::Sender;

#[cfg(feature = "playback")]
pub mod playback;

#[cfg(feature = "playback")]
pub use playback::CpalToneSink;

/// Sample rate used when a sink does not state a preference.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

// =============================================================================
// Errors
// =============================================================================

/// Errors from audio output.
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
    #[error("audio context could not be resumed: {0}")]
    Resume(String),
}

// =============================================================================
// Tones
// =============================================================================

/// Oscillator shape for a tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Value of the waveform at `phase` cycles (only the fractional part matters).
    fn sample(&self, phase: f32) -> f32 {
        let p = phase.fract();
        match self {
            Waveform::Sine => (2.0 * PI * p).sin(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
            Waveform::Sawtooth => 2.0 * p - 1.0,
        }
    }
}

impl std::str::FromStr for Waveform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "triangle" => Ok(Waveform::Triangle),
            "sawtooth" => Ok(Waveform::Sawtooth),
            other => Err(format!("Unknown waveform: {}", other)),
        }
    }
}

/// A short fixed-pitch tone.
#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration: Duration,
    /// Linear gain, clamped to [0.0, 1.0] at synthesis time.
    pub volume: f32,
    pub waveform: Waveform,
}

impl Tone {
    pub fn new(frequency_hz: f32, duration: Duration, volume: f32) -> Self {
        Self {
            frequency_hz,
            duration,
            volume,
            waveform: Waveform::Sine,
        }
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Render the tone as mono PCM samples in [-1.0, 1.0].
    pub fn synthesize(&self, sample_rate: u32) -> Vec<f32> {
        if sample_rate == 0 || self.frequency_hz <= 0.0 {
            return Vec::new();
        }
        let gain = self.volume.clamp(0.0, 1.0);
        let count = (self.duration.as_secs_f64() * sample_rate as f64).round() as usize;
        let step = self.frequency_hz / sample_rate as f32;
        (0..count)
            .map(|i| self.waveform.sample(step * i as f32) * gain)
            .collect()
    }
}

// =============================================================================
// Sink trait
// =============================================================================

/// Destination for synthesized tones.
///
/// Implementations must return quickly; playback happens in the background.
pub trait ToneSink: Send + Sync {
    /// Preferred sample rate for samples passed to `play`.
    fn sample_rate(&self) -> u32 {
        DEFAULT_SAMPLE_RATE
    }

    /// Make sure the output is running. Some hosts start suspended until a
    /// user gesture.
    fn resume(&self) -> Result<(), FeedbackError> {
        Ok(())
    }

    /// Start playing mono samples.
    fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), FeedbackError>;
}

// =============================================================================
// Emitter
// =============================================================================

/// Plays a distinct tone for user and bot messages.
#[derive(Clone)]
pub struct FeedbackEmitter {
    sink: Option<Arc<dyn ToneSink>>,
    user_tone: Tone,
    bot_tone: Tone,
}

impl std::fmt::Debug for FeedbackEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackEmitter")
            .field("audible", &self.sink.is_some())
            .field("user_tone", &self.user_tone)
            .field("bot_tone", &self.bot_tone)
            .finish()
    }
}

impl Default for FeedbackEmitter {
    fn default() -> Self {
        Self::silent()
    }
}

impl FeedbackEmitter {
    /// Emitter with the configured tones playing into `sink`.
    ///
    /// A disabled config yields a silent emitter. An unknown waveform falls
    /// back to sine.
    pub fn new(sink: Arc<dyn ToneSink>, config: &FeedbackConfig) -> Self {
        let waveform = config.waveform.parse::<Waveform>().unwrap_or_else(|e: String| {
            tracing::warn!(error = %e, "Using sine tones");
            Waveform::Sine
        });
        let (user_tone, bot_tone) = Self::tones(config, waveform);
        Self {
            sink: config.enabled.then_some(sink),
            user_tone,
            bot_tone,
        }
    }

    /// Emitter for hosts without audio output. Every call is a no-op.
    pub fn silent() -> Self {
        let (user_tone, bot_tone) = Self::tones(&FeedbackConfig::default(), Waveform::Sine);
        Self {
            sink: None,
            user_tone,
            bot_tone,
        }
    }

    fn tones(config: &FeedbackConfig, waveform: Waveform) -> (Tone, Tone) {
        let user = Tone::new(
            config.user_tone_hz,
            Duration::from_millis(config.user_tone_ms),
            config.volume,
        )
        .with_waveform(waveform);
        let bot = Tone::new(
            config.bot_tone_hz,
            Duration::from_millis(config.bot_tone_ms),
            config.volume,
        )
        .with_waveform(waveform);
        (user, bot)
    }

    pub fn is_audible(&self) -> bool {
        self.sink.is_some()
    }

    pub fn user_tone(&self) -> &Tone {
        &self.user_tone
    }

    pub fn bot_tone(&self) -> &Tone {
        &self.bot_tone
    }

    pub fn on_user_message(&self) {
        self.emit(&self.user_tone);
    }

    pub fn on_bot_message(&self) {
        self.emit(&self.bot_tone);
    }

    /// Tone for a message from `sender`.
    pub fn on_message(&self, sender: Sender) {
        match sender {
            Sender::User => self.on_user_message(),
            Sender::Bot => self.on_bot_message(),
        }
    }

    /// Resume the output before microphone use. Failures are swallowed.
    pub fn resume(&self) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.resume() {
                tracing::debug!(error = %e, "Audio resume failed");
            }
        }
    }

    fn emit(&self, tone: &Tone) {
        let Some(sink) = &self.sink else {
            return;
        };
        let sample_rate = sink.sample_rate();
        let samples = tone.synthesize(sample_rate);
        if let Err(e) = sink.play(samples, sample_rate) {
            tracing::debug!(error = %e, frequency_hz = tone.frequency_hz, "Tone dropped");
        }
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// A tone recorded by `MockToneSink`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedTone {
    pub samples: usize,
    pub sample_rate: u32,
    /// Largest absolute sample value.
    pub peak: f32,
}

/// Mock sink that records what it was asked to play.
///
/// Can be told to fail every call, to exercise the silent-degradation path.
#[derive(Debug, Default)]
pub struct MockToneSink {
    played: Mutex<Vec<PlayedTone>>,
    resumes: AtomicUsize,
    failing: bool,
}

impl MockToneSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `play` and `resume` always fail.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn played(&self) -> Vec<PlayedTone> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::Relaxed)
    }
}

impl ToneSink for MockToneSink {
    fn resume(&self) -> Result<(), FeedbackError> {
        self.resumes.fetch_add(1, Ordering::Relaxed);
        if self.failing {
            return Err(FeedbackError::Resume("mock failure".to_string()));
        }
        Ok(())
    }

    fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), FeedbackError> {
        if self.failing {
            return Err(FeedbackError::Playback("mock failure".to_string()));
        }
        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        if let Ok(mut played) = self.played.lock() {
            played.push(PlayedTone {
                samples: samples.len(),
                sample_rate,
                peak,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
