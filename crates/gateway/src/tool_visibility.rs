//! Tool-event visibility
//!
//! Effective verbosity is resolved run → session → global default. Anything
//! unresolved or failing to load counts as `Off`, so tool events stay hidden.

use std::sync::Arc;

use tracing::debug;

use relay_core::config::ConfigLoader;
use relay_core::run_context::RunContextStore;
use relay_core::session::SessionStore;
use relay_core::verbose::VerboseLevel;

pub struct ToolVisibilityResolver {
    run_contexts: Arc<RunContextStore>,
    sessions: Arc<dyn SessionStore>,
    config: Arc<dyn ConfigLoader>,
}

impl ToolVisibilityResolver {
    pub fn new(
        run_contexts: Arc<RunContextStore>,
        sessions: Arc<dyn SessionStore>,
        config: Arc<dyn ConfigLoader>,
    ) -> Self {
        Self {
            run_contexts,
            sessions,
            config,
        }
    }

    pub fn resolve_level(&self, run_id: &str, session_key: Option<&str>) -> VerboseLevel {
        if let Some(level) = self
            .run_contexts
            .lookup(run_id)
            .and_then(|c| c.verbose_level)
        {
            return level;
        }

        let Some(session_key) = session_key else {
            return VerboseLevel::Off;
        };

        let entry = match self.sessions.load_entry(session_key) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Session {} unavailable for tool visibility: {}", session_key, e);
                return VerboseLevel::Off;
            }
        };
        if let Some(level) = VerboseLevel::from_optional(entry.verbose_level.as_deref()) {
            return level;
        }

        match self.config.load() {
            Ok(config) => {
                VerboseLevel::from_optional(config.agents.defaults.verbose_default.as_deref())
                    .unwrap_or(VerboseLevel::Off)
            }
            Err(e) => {
                debug!("Config unavailable for tool visibility: {}", e);
                VerboseLevel::Off
            }
        }
    }

    pub fn is_tool_visible(&self, run_id: &str, session_key: Option<&str>) -> bool {
        self.resolve_level(run_id, session_key).shows_tools()
    }
}
