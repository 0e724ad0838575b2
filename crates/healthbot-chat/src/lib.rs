//! Healthbot Chat crate - the conversation session.
//!
//! Owns the session state machine and transcript, and coordinates the
//! analysis backend, speech adapters, audio feedback and rendering through
//! trait objects so each can be swapped for a host implementation or a mock.

pub mod backend;
pub mod controller;
pub mod error;
pub mod label;
pub mod render;
pub mod state;
pub mod transcript;

pub use backend::{Analysis, AnalysisBackend, HttpBackend, MockBackend};
pub use controller::{
    ResetOutcome, SessionController, SpeakOutcome, SubmitOutcome, VoiceOutcome,
};
pub use error::{BackendError, ChatError};
pub use render::{
    RecordingRenderer, RecordingStatusLine, Status, StatusLine, TerminalRenderer,
    TerminalStatusLine, TranscriptRenderer,
};
pub use state::{SessionState, StateMachine};
pub use transcript::Transcript;
