//! Healthbot Speech crate - speech input and output adapters.
//!
//! Wraps host speech-to-text and text-to-speech capabilities behind
//! single-shot async traits. Host capabilities may be absent; every adapter
//! reports availability up front so callers can degrade gracefully.

pub mod command;
pub mod error;
pub mod input;
pub mod output;

pub use error::SpeechError;
pub use input::{
    CommandRecognizer, RecognizerSettings, ScriptedRecognizer, SpeechRecognizer,
    UnavailableRecognizer,
};
pub use output::{
    CommandSynthesizer, RecordingSynthesizer, SpeechSynthesizer, UnavailableSynthesizer,
};
