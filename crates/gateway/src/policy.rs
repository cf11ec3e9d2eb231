//! Time-cached heartbeat display policy

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use relay_core::clock::Clock;
use relay_core::config::{
    resolve_heartbeat_visibility, ConfigLoader, GatewayConfig, WEBCHAT_CHANNEL,
};
use relay_core::heartbeat::DEFAULT_HEARTBEAT_ACK_MAX_CHARS;

/// How long a resolved policy is reused before configuration is read again
pub const HEARTBEAT_POLICY_TTL_MS: i64 = 5000;

/// Heartbeat display policy for the web chat channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPolicy {
    pub show_ok: bool,
    pub ack_max_chars: usize,
}

impl Default for HeartbeatPolicy {
    /// Hides plain acks while letting alerts through.
    fn default() -> Self {
        Self {
            show_ok: false,
            ack_max_chars: DEFAULT_HEARTBEAT_ACK_MAX_CHARS,
        }
    }
}

impl HeartbeatPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            show_ok: resolve_heartbeat_visibility(config, WEBCHAT_CHANNEL).show_ok,
            ack_max_chars: config.agents.defaults.heartbeat.resolved_ack_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedPolicy {
    policy: HeartbeatPolicy,
    loaded_at: i64,
}

/// Resolves [`HeartbeatPolicy`] from configuration, reusing it for
/// [`HEARTBEAT_POLICY_TTL_MS`].
pub struct HeartbeatPolicyCache {
    loader: Arc<dyn ConfigLoader>,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedPolicy>>,
}

impl HeartbeatPolicyCache {
    pub fn new(loader: Arc<dyn ConfigLoader>, clock: Arc<dyn Clock>) -> Self {
        Self {
            loader,
            clock,
            cached: Mutex::new(None),
        }
    }

    /// Current policy. Load failures yield the default and are not cached.
    pub fn resolve(&self) -> HeartbeatPolicy {
        let now = self.clock.now_ms();
        let mut cached = self.cached.lock();
        if let Some(entry) = cached.as_ref() {
            if now - entry.loaded_at < HEARTBEAT_POLICY_TTL_MS {
                return entry.policy;
            }
        }

        match self.loader.load() {
            Ok(config) => {
                let policy = HeartbeatPolicy::from_config(&config);
                debug!(
                    show_ok = policy.show_ok,
                    ack_max_chars = policy.ack_max_chars,
                    "heartbeat policy loaded"
                );
                *cached = Some(CachedPolicy {
                    policy,
                    loaded_at: now,
                });
                policy
            }
            Err(e) => {
                warn!("Failed to load config for heartbeat policy, using default: {}", e);
                HeartbeatPolicy::default()
            }
        }
    }

    /// Drop the cached policy so the next resolve reloads configuration
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}
