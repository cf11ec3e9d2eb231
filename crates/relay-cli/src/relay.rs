//! Wires a dispatcher to in-process sinks and renders emitted frames

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::mpsc;

use relay_core::clock::SystemClock;
use relay_core::config::ConfigLoader;
use relay_core::event::OutboundEvent;
use relay_core::run_context::RunContextStore;
use relay_core::session::SessionStore;
use relay_core::verbose::VerboseLevel;
use relay_gateway::{
    AgentEventDispatcher, ChatRunEntry, ChatRunState, DispatcherDeps, GatewayBroadcaster,
    SessionHub,
};

use crate::command::Command;

/// One printed output line
#[derive(Debug, Serialize)]
#[serde(tag = "target", rename_all = "lowercase")]
enum OutputLine<'a> {
    Broadcast {
        #[serde(flatten)]
        frame: &'a OutboundEvent,
    },
    #[serde(rename_all = "camelCase")]
    Session {
        session_key: &'a str,
        #[serde(flatten)]
        frame: &'a OutboundEvent,
    },
}

pub struct Relay {
    dispatcher: AgentEventDispatcher,
    broadcast_rx: mpsc::Receiver<OutboundEvent>,
    hub: Arc<SessionHub>,
    /// One hub subscription per session key named by a command, in the
    /// order the keys were first seen
    session_rxs: Vec<(String, mpsc::UnboundedReceiver<OutboundEvent>)>,
}

impl Relay {
    pub fn new(config: Arc<dyn ConfigLoader>, sessions: Arc<dyn SessionStore>) -> Self {
        let broadcaster = Arc::new(GatewayBroadcaster::new());
        let broadcast_rx = broadcaster.subscribe();
        let hub = Arc::new(SessionHub::new());

        let dispatcher = AgentEventDispatcher::new(DispatcherDeps {
            config,
            sessions,
            run_contexts: Arc::new(RunContextStore::new()),
            chat_runs: Arc::new(ChatRunState::new()),
            broadcaster,
            session_sender: hub.clone(),
            clock: Arc::new(SystemClock),
        });

        Self {
            dispatcher,
            broadcast_rx,
            hub,
            session_rxs: Vec::new(),
        }
    }

    /// Apply one input line and return the rendered frames it produced
    pub fn process_line(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let command: Command = serde_json::from_str(line).context("invalid command")?;
        self.apply(command);
        self.drain()
    }

    /// Frames only reach sessions with a live subscription, and a session key
    /// can only be resolved from a chat run or run context naming it.
    fn watch_session(&mut self, session_key: &str) {
        if self.session_rxs.iter().any(|(key, _)| key == session_key) {
            return;
        }
        let rx = self.hub.subscribe(session_key);
        self.session_rxs.push((session_key.to_string(), rx));
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::ChatRun {
                run_id,
                session_key,
                client_run_id,
            } => {
                self.watch_session(&session_key);
                self.dispatcher
                    .chat_runs()
                    .registry()
                    .add(&run_id, ChatRunEntry::new(session_key, client_run_id));
            }
            Command::RunContext {
                run_id,
                session_key,
                is_heartbeat,
                verbose_level,
            } => {
                if let Some(session_key) = session_key.as_deref() {
                    self.watch_session(session_key);
                }
                let verbose_level = VerboseLevel::from_optional(verbose_level.as_deref());
                self.dispatcher.run_contexts().update(&run_id, |context| {
                    if session_key.is_some() {
                        context.session_key = session_key;
                    }
                    if is_heartbeat.is_some() {
                        context.is_heartbeat = is_heartbeat;
                    }
                    if verbose_level.is_some() {
                        context.verbose_level = verbose_level;
                    }
                });
            }
            Command::Abort {
                run_id,
                client_run_id,
            } => {
                self.dispatcher
                    .chat_runs()
                    .mark_aborted(&run_id, client_run_id.as_deref());
            }
            Command::Event(event) => self.dispatcher.handle(&event),
        }
    }

    fn drain(&mut self) -> anyhow::Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Ok(frame) = self.broadcast_rx.try_recv() {
            lines.push(serde_json::to_string(&OutputLine::Broadcast { frame: &frame })?);
        }
        for (session_key, rx) in &mut self.session_rxs {
            while let Ok(frame) = rx.try_recv() {
                lines.push(serde_json::to_string(&OutputLine::Session {
                    session_key: session_key.as_str(),
                    frame: &frame,
                })?);
            }
        }
        Ok(lines)
    }
}
