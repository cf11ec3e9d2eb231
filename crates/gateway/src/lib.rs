//! Agent event gateway
//!
//! Coordinates chat runs and fans agent events out to the general broadcast
//! and to per-session delivery.

pub mod dispatcher;
pub mod policy;
pub mod registry;
pub mod sink;
pub mod state;
pub mod suppression;
pub mod tool_visibility;

#[cfg(test)]
mod test_support;

pub use dispatcher::{AgentEventDispatcher, DispatcherDeps, DELTA_THROTTLE_MS};
pub use policy::{HeartbeatPolicy, HeartbeatPolicyCache, HEARTBEAT_POLICY_TTL_MS};
pub use registry::{ChatRunEntry, ChatRunRegistry};
pub use sink::{BroadcastOptions, Broadcaster, GatewayBroadcaster, SessionHub, SessionSender};
pub use state::{ChatRunState, ChatStream};
pub use suppression::HeartbeatSuppression;
pub use tool_visibility::ToolVisibilityResolver;
