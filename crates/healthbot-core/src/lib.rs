pub mod config;
pub mod error;
pub mod types;

pub use config::HealthbotConfig;
pub use error::{HealthbotError, Result};
pub use types::*;
