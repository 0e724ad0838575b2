//! Healthbot API crate - the analysis backend.
//!
//! Serves symptom analysis, conversation history and reset over HTTP with
//! axum. Replies come from a keyword-based assessment that classifies
//! severity and composes a care plan.

pub mod assess;
pub mod error;
pub mod handlers;
pub mod history;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
