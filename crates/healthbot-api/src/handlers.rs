//! Route handlers for the analysis backend.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use healthbot_core::{HistoryTurn, Severity};

use crate::assess::{self, CarePlan};
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub text: String,
    pub severity: Severity,
    pub actions: CarePlan,
    /// Always null; replies are voiced by the client.
    pub tts_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub turns: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/healthbot - assess one message and record the turn.
///
/// Bodies that are not JSON, or lack a string `message`, count as empty.
pub async fn analyze(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let request: AnalyzeRequest = serde_json::from_slice(&body).unwrap_or_default();
    let message = assess::clean_text(&request.message);
    if message.is_empty() {
        return Err(ApiError::BadRequest("Empty message".to_string()));
    }

    let assessment = assess::assess(&message);
    tracing::info!(severity = %assessment.severity, chars = message.len(), "Message analyzed");

    let turn = HistoryTurn::new(&message, &assessment.reply)
        .with_meta("mode", "MOCK")
        .with_meta("severity", assessment.severity.to_string());
    if let Err(e) = state.history.record(turn) {
        tracing::warn!(error = %e, "Failed to persist history turn");
    }

    Ok(Json(AnalyzeResponse {
        text: assessment.reply,
        severity: assessment.severity,
        actions: assessment.plan,
        tts_url: None,
    }))
}

/// GET /api/history - every recorded turn, oldest first.
pub async fn history(State(state): State<AppState>) -> Json<Vec<HistoryTurn>> {
    Json(state.history.list())
}

/// POST /api/reset - forget the conversation.
pub async fn reset(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    state.history.clear()?;
    tracing::info!("History cleared");
    Ok(Json(ResetResponse { ok: true }))
}

/// GET /health - liveness.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        turns: state.history.len(),
    })
}
