//! Chat run registry
//!
//! Binds chat turns started by clients (`client_run_id`) to the internal run
//! executing them. Several turns may queue behind one internal run.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRunEntry {
    pub session_key: String,
    pub client_run_id: String,
}

impl ChatRunEntry {
    pub fn new(session_key: impl Into<String>, client_run_id: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            client_run_id: client_run_id.into(),
        }
    }
}

/// FIFO queues of chat run entries keyed by internal run id.
/// Every operation takes the lock exactly once.
#[derive(Debug, Default)]
pub struct ChatRunRegistry {
    runs: Mutex<HashMap<String, VecDeque<ChatRunEntry>>>,
}

impl ChatRunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, run_id: &str, entry: ChatRunEntry) {
        self.runs
            .lock()
            .entry(run_id.to_string())
            .or_default()
            .push_back(entry);
    }

    pub fn peek(&self, run_id: &str) -> Option<ChatRunEntry> {
        self.runs
            .lock()
            .get(run_id)
            .and_then(|queue| queue.front().cloned())
    }

    /// Remove and return the oldest entry; drops the queue once empty.
    pub fn shift(&self, run_id: &str) -> Option<ChatRunEntry> {
        let mut runs = self.runs.lock();
        let queue = runs.get_mut(run_id)?;
        let entry = queue.pop_front();
        if queue.is_empty() {
            runs.remove(run_id);
        }
        entry
    }

    /// Remove the first entry matching `client_run_id` (and `session_key`
    /// when given). No-op when nothing matches.
    pub fn remove(
        &self,
        run_id: &str,
        client_run_id: &str,
        session_key: Option<&str>,
    ) -> Option<ChatRunEntry> {
        let mut runs = self.runs.lock();
        let queue = runs.get_mut(run_id)?;
        let idx = queue.iter().position(|entry| {
            entry.client_run_id == client_run_id
                && session_key.map_or(true, |key| entry.session_key == key)
        })?;
        let removed = queue.remove(idx);
        if queue.is_empty() {
            runs.remove(run_id);
        }
        removed
    }

    pub fn clear(&self) {
        self.runs.lock().clear();
    }

    pub fn contains(&self, run_id: &str) -> bool {
        self.runs.lock().contains_key(run_id)
    }

    /// Number of entries queued under `run_id`
    pub fn queued(&self, run_id: &str) -> usize {
        self.runs.lock().get(run_id).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_and_queue_removal() {
        let registry = ChatRunRegistry::new();
        let a = ChatRunEntry::new("main", "client-a");
        let b = ChatRunEntry::new("main", "client-b");
        registry.add("run-1", a.clone());
        registry.add("run-1", b.clone());

        assert_eq!(registry.peek("run-1"), Some(a.clone()));
        assert_eq!(registry.shift("run-1"), Some(a));
        assert_eq!(registry.shift("run-1"), Some(b));
        assert_eq!(registry.shift("run-1"), None);
        assert!(!registry.contains("run-1"));
    }

    #[test]
    fn test_remove_matches_client_and_optional_session() {
        let registry = ChatRunRegistry::new();
        registry.add("run-1", ChatRunEntry::new("main", "client-a"));
        registry.add("run-1", ChatRunEntry::new("other", "client-b"));

        assert_eq!(registry.remove("run-1", "client-b", Some("main")), None);
        assert_eq!(registry.queued("run-1"), 2);

        let removed = registry.remove("run-1", "client-b", None).unwrap();
        assert_eq!(removed.session_key, "other");
        assert_eq!(registry.queued("run-1"), 1);

        registry.remove("run-1", "client-a", Some("main"));
        assert!(!registry.contains("run-1"));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = ChatRunRegistry::new();
        assert_eq!(registry.remove("run-1", "client-a", None), None);

        registry.add("run-1", ChatRunEntry::new("main", "client-a"));
        assert_eq!(registry.remove("run-1", "client-x", None), None);
        assert_eq!(registry.queued("run-1"), 1);
    }

    #[test]
    fn test_shared_client_id_removes_first_match_only() {
        let registry = ChatRunRegistry::new();
        registry.add("run-1", ChatRunEntry::new("s1", "client-a"));
        registry.add("run-1", ChatRunEntry::new("s2", "client-a"));

        let removed = registry.remove("run-1", "client-a", None).unwrap();
        assert_eq!(removed.session_key, "s1");
        assert_eq!(registry.peek("run-1").unwrap().session_key, "s2");
    }

    #[test]
    fn test_clear() {
        let registry = ChatRunRegistry::new();
        registry.add("run-1", ChatRunEntry::new("main", "client-a"));
        registry.add("run-2", ChatRunEntry::new("main", "client-b"));
        registry.clear();
        assert!(registry.peek("run-1").is_none());
        assert!(registry.peek("run-2").is_none());
    }
}
