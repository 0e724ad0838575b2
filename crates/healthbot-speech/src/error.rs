//! Error types for the speech adapters.

/// Errors from speech recognition or synthesis.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech capability unavailable: {0}")]
    Unavailable(String),
    #[error("a listen operation is already in progress")]
    Busy,
    #[error("no speech detected")]
    NoSpeech,
    #[error("recognition timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("recognition failed: {0}")]
    Recognition(String),
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
