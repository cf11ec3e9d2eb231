//! Heartbeat ack suppression for the general broadcast channel
//!
//! Only the broadcast seen by all observers is filtered. The owning session
//! always receives its run's output.

use std::sync::Arc;

use relay_core::heartbeat::{strip_heartbeat_token, StripMode};
use relay_core::run_context::RunContextStore;

use crate::policy::HeartbeatPolicyCache;

pub struct HeartbeatSuppression {
    policy: Arc<HeartbeatPolicyCache>,
    run_contexts: Arc<RunContextStore>,
}

impl HeartbeatSuppression {
    pub fn new(policy: Arc<HeartbeatPolicyCache>, run_contexts: Arc<RunContextStore>) -> Self {
        Self {
            policy,
            run_contexts,
        }
    }

    pub fn policy(&self) -> &HeartbeatPolicyCache {
        &self.policy
    }

    /// Whether the run is a heartbeat run. An explicit flag on the client run
    /// wins, including an explicit `false`; otherwise the internal run decides.
    pub fn is_heartbeat_run(&self, run_id: &str, client_run_id: &str) -> bool {
        if let Some(flag) = self
            .run_contexts
            .lookup(client_run_id)
            .and_then(|c| c.is_heartbeat)
        {
            return flag;
        }
        self.run_contexts
            .lookup(run_id)
            .and_then(|c| c.is_heartbeat)
            .unwrap_or(false)
    }

    /// Whether a chat broadcast carrying `text` should be withheld
    pub fn should_suppress(&self, run_id: &str, client_run_id: &str, text: &str) -> bool {
        if !self.is_heartbeat_run(run_id, client_run_id) {
            return false;
        }
        let policy = self.policy.resolve();
        if policy.show_ok {
            return false;
        }
        let normalized = text.trim();
        if normalized.is_empty() {
            return true;
        }
        strip_heartbeat_token(normalized, StripMode::Heartbeat, policy.ack_max_chars).should_skip
    }
}
