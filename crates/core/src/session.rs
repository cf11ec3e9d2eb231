//! Session entry lookup
//!
//! The gateway only reads session entries; they are written by whatever owns
//! the session lifecycle.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Persisted per-session settings relevant to event delivery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Synchronous session-entry source
pub trait SessionStore: Send + Sync {
    /// Load an entry; `Error::SessionNotFound` when the key is unknown.
    fn load_entry(&self, session_key: &str) -> Result<SessionEntry>;
}

/// Session store held in memory
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session_key: &str, entry: SessionEntry) {
        self.entries.write().insert(session_key.to_string(), entry);
    }

    pub fn remove(&self, session_key: &str) -> bool {
        self.entries.write().remove(session_key).is_some()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load_entry(&self, session_key: &str) -> Result<SessionEntry> {
        self.entries
            .read()
            .get(session_key)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_key.to_string()))
    }
}

/// Session store backed by a JSON object keyed by session key.
///
/// The file is re-read on every lookup so external edits are picked up.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Raw entries; each one is only decoded when asked for, so a bad
    /// sibling cannot hide a good entry.
    fn read_all(&self) -> Result<Map<String, Value>> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl SessionStore for FileSessionStore {
    fn load_entry(&self, session_key: &str) -> Result<SessionEntry> {
        let raw = self
            .read_all()?
            .remove(session_key)
            .ok_or_else(|| Error::SessionNotFound(session_key.to_string()))?;
        Ok(serde_json::from_value(raw)?)
    }
}
