use thiserror::Error;

/// Top-level error type for the Healthbot system.
///
/// Subsystem crates define their own error types and implement
/// `From<HealthbotError>` where they need to absorb configuration or
/// storage failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HealthbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for HealthbotError {
    fn from(err: toml::de::Error) -> Self {
        HealthbotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HealthbotError {
    fn from(err: toml::ser::Error) -> Self {
        HealthbotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HealthbotError {
    fn from(err: serde_json::Error) -> Self {
        HealthbotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Healthbot operations.
pub type Result<T> = std::result::Result<T, HealthbotError>;
