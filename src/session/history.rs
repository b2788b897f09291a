//! Bounded, most-recent-first log of resolved commands.
//!
//! Persisted as a JSON array under [`HISTORY_KEY`]. Entries are immutable;
//! the only way one disappears is by being pushed past [`HISTORY_LIMIT`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logging;
use crate::storage::{HISTORY_KEY, Storage};

/// Maximum number of entries kept.
pub const HISTORY_LIMIT: usize = 20;

/// One resolved command and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub command: String,
    /// Human status plus the client-local time it resolved at.
    pub summary: String,
    pub output: String,
    #[serde(default)]
    pub raw: Vec<String>,
}

#[derive(Debug)]
pub struct HistoryStore<S> {
    storage: S,
}

impl<S: Storage> HistoryStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// All stored entries, newest first. Never fails: corrupt storage is
    /// logged and treated as empty, and malformed elements inside an
    /// otherwise valid array are skipped.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let Some(raw) = self.storage.read(HISTORY_KEY) else {
            return Vec::new();
        };

        let items = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                logging::warn("persisted history is not a JSON array, ignoring it");
                return Vec::new();
            }
            Err(e) => {
                logging::warn(&format!("persisted history is corrupt, ignoring it: {e}"));
                return Vec::new();
            }
        };

        let total = items.len();
        let mut entries: Vec<HistoryEntry> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        if entries.len() < total {
            logging::warn(&format!(
                "skipped {} malformed history entries",
                total - entries.len()
            ));
        }
        entries.truncate(HISTORY_LIMIT);
        entries
    }

    /// Insert at the head, drop anything past the limit, persist the list.
    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.load();
        entries.insert(0, entry);
        entries.truncate(HISTORY_LIMIT);

        let json = serde_json::to_string(&entries).context("failed to serialize history")?;
        self.storage.write(HISTORY_KEY, &json)
    }

    /// Entry at `index`, where 0 is the most recent.
    pub fn get(&self, index: usize) -> Option<HistoryEntry> {
        self.load().into_iter().nth(index)
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
