//! Conversation history, kept in memory and mirrored to a JSON file.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use healthbot_core::{HealthbotError, HistoryTurn, Result};

/// Recorded turns, oldest first.
///
/// With a backing file every change rewrites the whole file. A missing or
/// unreadable file starts an empty history.
#[derive(Debug)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    turns: Mutex<Vec<HistoryTurn>>,
}

impl HistoryStore {
    /// History that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            turns: Mutex::new(Vec::new()),
        }
    }

    /// History backed by `path`, loading whatever is already there.
    pub fn open(path: &Path) -> Self {
        let turns = read_turns(path);
        tracing::info!(path = %path.display(), turns = turns.len(), "History loaded");
        Self {
            path: Some(path.to_path_buf()),
            turns: Mutex::new(turns),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HistoryTurn>> {
        self.turns.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn list(&self) -> Vec<HistoryTurn> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append a turn. The in-memory copy is updated even if the file write fails.
    pub fn record(&self, turn: HistoryTurn) -> Result<()> {
        let mut turns = self.lock();
        turns.push(turn);
        self.persist(&turns)
    }

    pub fn clear(&self) -> Result<()> {
        let mut turns = self.lock();
        turns.clear();
        self.persist(&turns)
    }

    fn persist(&self, turns: &[HistoryTurn]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(turns)?;
        std::fs::write(path, content)
            .map_err(|e| HealthbotError::Storage(format!("{}: {}", path.display(), e)))
    }
}

fn read_turns(path: &Path) -> Vec<HistoryTurn> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable history file, starting empty");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<HistoryTurn>>(&content) {
        Ok(turns) => turns,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Corrupt history file, starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_record_and_clear() {
        let store = HistoryStore::in_memory();
        assert!(store.is_empty());
        store.record(HistoryTurn::new("fever", "Rest")).unwrap();
        store.record(HistoryTurn::new("cough", "Gargle")).unwrap();
        let turns = store.list();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].user, "fever");
        assert_eq!(turns[1].user, "cough");

        store.clear().unwrap();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("history.json");

        let store = HistoryStore::open(&path);
        assert!(store.is_empty());
        store
            .record(HistoryTurn::new("fever", "Rest").with_meta("mode", "MOCK"))
            .unwrap();
        assert!(path.exists());

        let reopened = HistoryStore::open(&path);
        let turns = reopened.list();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].bot, "Rest");
        assert_eq!(turns[0].meta["mode"], "MOCK");

        reopened.clear().unwrap();
        assert!(HistoryStore::open(&path).is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(HistoryStore::open(&path).is_empty());

        std::fs::write(&path, r#"{"user":"not a list"}"#).unwrap();
        assert!(HistoryStore::open(&path).is_empty());
    }
}
