//! Error types for the conversation session.

use crate::state::SessionState;

/// Failures talking to the analysis backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend returned HTTP {0}")]
    Status(u16),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

/// Errors from the session controller and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
    #[error(transparent)]
    Backend(#[from] BackendError),
}
