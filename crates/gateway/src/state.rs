//! Chat run state: registry, per-turn text buffers and abort markers

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::registry::ChatRunRegistry;

/// Streaming state of one chat turn, keyed by its client run id.
/// Exists from the first delta until the turn is finalized or cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatStream {
    /// Latest full assistant text (replaced, not appended)
    pub text: String,
    /// When the last delta was emitted
    pub last_delta_at: Option<i64>,
}

#[derive(Debug, Default)]
pub struct ChatRunState {
    registry: ChatRunRegistry,
    streams: Mutex<HashMap<String, ChatStream>>,
    aborted: Mutex<HashSet<String>>,
}

impl ChatRunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ChatRunRegistry {
        &self.registry
    }

    /// Store the latest text and decide whether a delta may go out now.
    ///
    /// Returns `true` (and records `now`) when at least `min_interval_ms` has
    /// passed since the previous delta for this turn.
    pub fn push_delta(
        &self,
        client_run_id: &str,
        text: &str,
        now: i64,
        min_interval_ms: i64,
    ) -> bool {
        let mut streams = self.streams.lock();
        let stream = streams.entry(client_run_id.to_string()).or_default();
        stream.text = text.to_string();

        if let Some(last) = stream.last_delta_at {
            if now - last < min_interval_ms {
                return false;
            }
        }
        stream.last_delta_at = Some(now);
        true
    }

    pub fn buffered_text(&self, client_run_id: &str) -> Option<String> {
        self.streams
            .lock()
            .get(client_run_id)
            .map(|stream| stream.text.clone())
    }

    /// Remove the buffer and throttle timestamp for a turn in one step
    pub fn take_stream(&self, client_run_id: &str) -> Option<ChatStream> {
        self.streams.lock().remove(client_run_id)
    }

    /// Record a cancellation under both identities of the run
    pub fn mark_aborted(&self, run_id: &str, client_run_id: Option<&str>) {
        let mut aborted = self.aborted.lock();
        aborted.insert(run_id.to_string());
        if let Some(client_run_id) = client_run_id {
            aborted.insert(client_run_id.to_string());
        }
    }

    pub fn is_aborted(&self, client_run_id: &str, run_id: &str) -> bool {
        let aborted = self.aborted.lock();
        aborted.contains(client_run_id) || aborted.contains(run_id)
    }

    pub fn clear_aborted(&self, client_run_id: &str, run_id: &str) {
        let mut aborted = self.aborted.lock();
        aborted.remove(client_run_id);
        aborted.remove(run_id);
    }

    /// Wipe registry, buffers and abort markers
    pub fn clear(&self) {
        self.registry.clear();
        self.streams.lock().clear();
        self.aborted.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ChatRunEntry;

    #[test]
    fn test_push_delta_throttles_but_keeps_latest_text() {
        let state = ChatRunState::new();
        assert!(state.push_delta("client-1", "Hel", 1_000, 150));
        assert!(!state.push_delta("client-1", "Hello", 1_100, 150));
        assert_eq!(state.buffered_text("client-1").as_deref(), Some("Hello"));

        assert!(state.push_delta("client-1", "Hello there", 1_150, 150));
    }

    #[test]
    fn test_take_stream_clears_once() {
        let state = ChatRunState::new();
        state.push_delta("client-1", "Hi", 1_000, 150);

        let stream = state.take_stream("client-1").unwrap();
        assert_eq!(stream.text, "Hi");
        assert_eq!(stream.last_delta_at, Some(1_000));
        assert!(state.take_stream("client-1").is_none());
    }

    #[test]
    fn test_abort_markers_cover_both_identities() {
        let state = ChatRunState::new();
        state.mark_aborted("run-1", Some("client-1"));

        assert!(state.is_aborted("client-1", "other"));
        assert!(state.is_aborted("other", "run-1"));

        state.clear_aborted("client-1", "run-1");
        assert!(!state.is_aborted("client-1", "run-1"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let state = ChatRunState::new();
        state.registry().add("run-1", ChatRunEntry::new("main", "client-1"));
        state.push_delta("client-1", "Hi", 1_000, 150);
        state.mark_aborted("run-1", None);

        state.clear();
        assert!(state.registry().peek("run-1").is_none());
        assert!(state.buffered_text("client-1").is_none());
        assert!(!state.is_aborted("run-1", "run-1"));
    }
}
