//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::history::HistoryStore;

/// Shared application state, cloned into each handler.
#[derive(Clone)]
pub struct AppState {
    pub history: Arc<HistoryStore>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(history: HistoryStore) -> Self {
        Self {
            history: Arc::new(history),
            start_time: Instant::now(),
        }
    }

    /// State with a history file, or in-memory history when `history_file`
    /// is empty.
    pub fn from_history_file(history_file: &str) -> Self {
        if history_file.trim().is_empty() {
            Self::new(HistoryStore::in_memory())
        } else {
            Self::new(HistoryStore::open(std::path::Path::new(history_file)))
        }
    }
}
