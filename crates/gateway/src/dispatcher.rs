//! Agent event dispatcher
//!
//! Consumes agent events one at a time and fans them out to the general
//! broadcast and to the owning session. Along the way it checks per-run
//! sequence continuity, maps internal run ids to the client-facing run id,
//! hides tool events the session did not ask for, throttles chat deltas and
//! keeps heartbeat acks off the general broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use relay_core::chat::ChatEvent;
use relay_core::clock::Clock;
use relay_core::config::ConfigLoader;
use relay_core::event::{
    AgentEvent, AgentPayload, AgentStream, OutboundEvent, RunOutcome, SeqGapEvent,
};
use relay_core::format::format_error_for_log;
use relay_core::run_context::RunContextStore;
use relay_core::session::SessionStore;

use crate::policy::HeartbeatPolicyCache;
use crate::registry::ChatRunEntry;
use crate::sink::{BroadcastOptions, Broadcaster, SessionSender};
use crate::state::ChatRunState;
use crate::suppression::HeartbeatSuppression;
use crate::tool_visibility::ToolVisibilityResolver;

/// Minimum spacing between chat deltas for one client run
pub const DELTA_THROTTLE_MS: i64 = 150;

/// Collaborators a dispatcher is built from
#[derive(Clone)]
pub struct DispatcherDeps {
    pub config: Arc<dyn ConfigLoader>,
    pub sessions: Arc<dyn SessionStore>,
    pub run_contexts: Arc<RunContextStore>,
    pub chat_runs: Arc<ChatRunState>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub session_sender: Arc<dyn SessionSender>,
    pub clock: Arc<dyn Clock>,
}

/// Identity of the chat turn an event belongs to, resolved once per event
struct ResolvedRun {
    /// Registry entry at the head of the run's queue, if any
    chat_link: Option<ChatRunEntry>,
    session_key: Option<String>,
    /// Run id shown to consumers
    client_run_id: String,
    aborted: bool,
}

/// Routes agent events to the broadcast and the owning session.
///
/// Last-seen sequence numbers are kept per internal run id for the life of
/// the dispatcher, since one run can serve several queued chat turns and a
/// terminal event does not mean the run id is finished. The map therefore
/// grows with the number of distinct runs; call [`reset`](Self::reset) to
/// reclaim it.
pub struct AgentEventDispatcher {
    chat_runs: Arc<ChatRunState>,
    run_contexts: Arc<RunContextStore>,
    heartbeat: HeartbeatSuppression,
    tool_visibility: ToolVisibilityResolver,
    broadcaster: Arc<dyn Broadcaster>,
    session_sender: Arc<dyn SessionSender>,
    clock: Arc<dyn Clock>,
    last_seq: Mutex<HashMap<String, u64>>,
}

impl AgentEventDispatcher {
    pub fn new(deps: DispatcherDeps) -> Self {
        let policy = Arc::new(HeartbeatPolicyCache::new(
            deps.config.clone(),
            deps.clock.clone(),
        ));
        Self {
            heartbeat: HeartbeatSuppression::new(policy, deps.run_contexts.clone()),
            tool_visibility: ToolVisibilityResolver::new(
                deps.run_contexts.clone(),
                deps.sessions,
                deps.config,
            ),
            chat_runs: deps.chat_runs,
            run_contexts: deps.run_contexts,
            broadcaster: deps.broadcaster,
            session_sender: deps.session_sender,
            clock: deps.clock,
            last_seq: Mutex::new(HashMap::new()),
        }
    }

    pub fn chat_runs(&self) -> &Arc<ChatRunState> {
        &self.chat_runs
    }

    pub fn run_contexts(&self) -> &Arc<RunContextStore> {
        &self.run_contexts
    }

    /// Last sequence number seen for a run
    pub fn last_seq(&self, run_id: &str) -> Option<u64> {
        self.last_seq.lock().get(run_id).copied()
    }

    /// Forget all chat state, sequence counters and the cached policy
    pub fn reset(&self) {
        self.chat_runs.clear();
        self.last_seq.lock().clear();
        self.heartbeat.policy().invalidate();
    }

    /// Process one agent event to completion
    pub fn handle(&self, event: &AgentEvent) {
        let run = self.resolve_run(event);

        let shaped = match run.session_key.as_deref() {
            Some(session_key) => event.with_session_key(session_key),
            None => event.clone(),
        };

        if event.stream == AgentStream::Tool
            && !self
                .tool_visibility
                .is_tool_visible(&event.run_id, run.session_key.as_deref())
        {
            self.last_seq.lock().insert(event.run_id.clone(), event.seq);
            debug!(run_id = %event.run_id, seq = event.seq, "tool event hidden");
            return;
        }

        self.check_sequence(event, run.session_key.as_deref());

        let frame = OutboundEvent::Agent(AgentPayload::Event(shaped));
        self.broadcaster.broadcast(&frame, BroadcastOptions::default());
        if let Some(session_key) = run.session_key.as_deref() {
            self.session_sender.send_to_session(session_key, &frame);
        }

        let outcome = event.lifecycle_phase().and_then(RunOutcome::from_phase);

        if let Some(session_key) = run.session_key.as_deref() {
            match outcome {
                None if !run.aborted && event.stream == AgentStream::Assistant => {
                    if let Some(text) = event.text() {
                        self.emit_delta(event, session_key, &run.client_run_id, text);
                    }
                }
                Some(outcome) if !run.aborted => {
                    self.finish_chat_run(event, session_key, run.chat_link.as_ref(), outcome);
                }
                Some(_) => self.clean_up_aborted(event, &run),
                None => {}
            }
        }

        if outcome.is_some() {
            self.run_contexts.clear(&event.run_id);
        }
    }

    fn resolve_run(&self, event: &AgentEvent) -> ResolvedRun {
        let chat_link = self.chat_runs.registry().peek(&event.run_id);
        let session_key = match &chat_link {
            Some(entry) => Some(entry.session_key.clone()),
            None => self.run_contexts.session_key_for_run(&event.run_id),
        };
        let client_run_id = chat_link
            .as_ref()
            .map(|entry| entry.client_run_id.clone())
            .unwrap_or_else(|| event.run_id.clone());
        let aborted = self.chat_runs.is_aborted(&client_run_id, &event.run_id);

        ResolvedRun {
            chat_link,
            session_key,
            client_run_id,
            aborted,
        }
    }

    /// Report a discontinuity in the run's sequence numbers; never fatal.
    fn check_sequence(&self, event: &AgentEvent, session_key: Option<&str>) {
        let last = self
            .last_seq
            .lock()
            .insert(event.run_id.clone(), event.seq)
            .unwrap_or(0);
        let expected = last.saturating_add(1);
        if last < u64::MAX && event.seq == expected {
            return;
        }

        warn!(
            "Sequence gap on run {}: expected {}, received {}",
            event.run_id, expected, event.seq
        );
        let gap = SeqGapEvent::new(
            &event.run_id,
            self.clock.now_ms(),
            session_key,
            expected,
            event.seq,
        );
        self.broadcaster.broadcast(
            &OutboundEvent::Agent(AgentPayload::SeqGap(gap)),
            BroadcastOptions::default(),
        );
    }

    fn emit_delta(&self, event: &AgentEvent, session_key: &str, client_run_id: &str, text: &str) {
        let now = self.clock.now_ms();
        if !self
            .chat_runs
            .push_delta(client_run_id, text, now, DELTA_THROTTLE_MS)
        {
            debug!(client_run_id, seq = event.seq, "delta throttled");
            return;
        }

        let frame = OutboundEvent::Chat(ChatEvent::delta(
            client_run_id,
            session_key,
            event.seq,
            text,
            now,
        ));
        if self
            .heartbeat
            .should_suppress(&event.run_id, client_run_id, text)
        {
            debug!(client_run_id, "heartbeat delta kept off broadcast");
        } else {
            self.broadcaster
                .broadcast(&frame, BroadcastOptions::drop_if_slow());
        }
        self.session_sender.send_to_session(session_key, &frame);
    }

    fn finish_chat_run(
        &self,
        event: &AgentEvent,
        session_key: &str,
        chat_link: Option<&ChatRunEntry>,
        outcome: RunOutcome,
    ) {
        if chat_link.is_none() {
            self.emit_final(event, session_key, &event.run_id, outcome);
            return;
        }

        // The entry may have been shifted by someone else since it was peeked;
        // finalize with whatever entry this shift actually returns.
        match self.chat_runs.registry().shift(&event.run_id) {
            Some(finished) => {
                self.emit_final(event, &finished.session_key, &finished.client_run_id, outcome)
            }
            None => debug!(run_id = %event.run_id, "chat run already finalized"),
        }
    }

    fn emit_final(
        &self,
        event: &AgentEvent,
        session_key: &str,
        client_run_id: &str,
        outcome: RunOutcome,
    ) {
        let text = self
            .chat_runs
            .take_stream(client_run_id)
            .map(|stream| stream.text.trim().to_string())
            .unwrap_or_default();

        match outcome {
            RunOutcome::Done => {
                let frame = OutboundEvent::Chat(ChatEvent::final_text(
                    client_run_id,
                    session_key,
                    event.seq,
                    &text,
                    self.clock.now_ms(),
                ));
                if self
                    .heartbeat
                    .should_suppress(&event.run_id, client_run_id, &text)
                {
                    debug!(client_run_id, "heartbeat final kept off broadcast");
                } else {
                    self.broadcaster.broadcast(&frame, BroadcastOptions::default());
                }
                self.session_sender.send_to_session(session_key, &frame);
            }
            RunOutcome::Error => {
                let error_message = event.error().and_then(format_error_for_log);
                let frame = OutboundEvent::Chat(ChatEvent::error(
                    client_run_id,
                    session_key,
                    event.seq,
                    error_message,
                ));
                self.broadcaster.broadcast(&frame, BroadcastOptions::default());
                self.session_sender.send_to_session(session_key, &frame);
            }
        }
    }

    fn clean_up_aborted(&self, event: &AgentEvent, run: &ResolvedRun) {
        self.chat_runs
            .clear_aborted(&run.client_run_id, &event.run_id);
        self.chat_runs.take_stream(&run.client_run_id);
        if let Some(entry) = &run.chat_link {
            self.chat_runs.registry().remove(
                &event.run_id,
                &entry.client_run_id,
                Some(&entry.session_key),
            );
        }
        debug!(
            run_id = %event.run_id,
            client_run_id = %run.client_run_id,
            "aborted chat run cleaned up"
        );
    }
}
