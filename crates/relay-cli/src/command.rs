//! Input commands accepted by the replay tool

use serde::Deserialize;

use relay_core::event::AgentEvent;

/// One NDJSON input line, tagged by `op`
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Command {
    /// Bind a client-initiated chat turn to an internal run
    #[serde(rename_all = "camelCase")]
    ChatRun {
        run_id: String,
        session_key: String,
        client_run_id: String,
    },
    /// Register or update run metadata
    #[serde(rename_all = "camelCase")]
    RunContext {
        run_id: String,
        #[serde(default)]
        session_key: Option<String>,
        #[serde(default)]
        is_heartbeat: Option<bool>,
        #[serde(default)]
        verbose_level: Option<String>,
    },
    /// Mark a run as cancelled
    #[serde(rename_all = "camelCase")]
    Abort {
        run_id: String,
        #[serde(default)]
        client_run_id: Option<String>,
    },
    /// Agent event to dispatch
    Event(AgentEvent),
}
