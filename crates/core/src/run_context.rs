//! Per-run metadata registered by the code that starts agent runs

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::verbose::VerboseLevel;

/// Metadata attached to one run identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRunContext {
    pub session_key: Option<String>,
    /// `None` means unknown; `Some(false)` is an explicit "not a heartbeat".
    pub is_heartbeat: Option<bool>,
    pub verbose_level: Option<VerboseLevel>,
}

/// Shared run-context registry keyed by run identifier
#[derive(Debug, Default)]
pub struct RunContextStore {
    contexts: Mutex<HashMap<String, AgentRunContext>>,
}

impl RunContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the context for a run
    pub fn register(&self, run_id: &str, context: AgentRunContext) {
        self.contexts.lock().insert(run_id.to_string(), context);
    }

    /// Merge fields into an existing context, creating it if absent
    pub fn update(&self, run_id: &str, apply: impl FnOnce(&mut AgentRunContext)) {
        let mut contexts = self.contexts.lock();
        apply(contexts.entry(run_id.to_string()).or_default());
    }

    pub fn lookup(&self, run_id: &str) -> Option<AgentRunContext> {
        self.contexts.lock().get(run_id).cloned()
    }

    /// Session key recorded for a run, if any
    pub fn session_key_for_run(&self, run_id: &str) -> Option<String> {
        self.contexts
            .lock()
            .get(run_id)
            .and_then(|c| c.session_key.clone())
    }

    pub fn clear(&self, run_id: &str) {
        self.contexts.lock().remove(run_id);
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
