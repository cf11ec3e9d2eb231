//! Agent event types and outbound gateway frames

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::chat::ChatEvent;

/// Reason string carried by synthetic sequence-gap events
pub const SEQ_GAP_REASON: &str = "seq gap";

/// Stream an agent event was emitted on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentStream {
    Assistant,
    Tool,
    Lifecycle,
    Error,
    Other(String),
}

impl AgentStream {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Lifecycle => "lifecycle",
            Self::Error => "error",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for AgentStream {
    fn from(value: String) -> Self {
        match value.as_str() {
            "assistant" => Self::Assistant,
            "tool" => Self::Tool,
            "lifecycle" => Self::Lifecycle,
            "error" => Self::Error,
            _ => Self::Other(value),
        }
    }
}

impl From<AgentStream> for String {
    fn from(value: AgentStream) -> Self {
        match value {
            AgentStream::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

/// Terminal outcome of a run, derived from its lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Done,
    Error,
}

impl RunOutcome {
    /// Map a lifecycle phase to a terminal outcome (`end` / `error`)
    pub fn from_phase(phase: &str) -> Option<Self> {
        match phase {
            "end" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One sequenced event produced by an agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    pub run_id: String,
    pub seq: u64,
    pub stream: AgentStream,
    /// Epoch milliseconds as sent by the producer, integer or fractional
    pub ts: Number,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

impl AgentEvent {
    pub fn new(run_id: impl Into<String>, seq: u64, stream: AgentStream, ts: i64) -> Self {
        Self {
            run_id: run_id.into(),
            seq,
            stream,
            ts: ts.into(),
            data: Map::new(),
            session_key: None,
        }
    }

    /// Builder-style helper to set one `data` field
    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Copy of this event with the session key attached
    pub fn with_session_key(&self, session_key: &str) -> Self {
        let mut shaped = self.clone();
        shaped.session_key = Some(session_key.to_string());
        shaped
    }

    /// `data.text` when it is a string
    pub fn text(&self) -> Option<&str> {
        self.data.get("text").and_then(Value::as_str)
    }

    /// `data.phase` for lifecycle events when it is a string
    pub fn lifecycle_phase(&self) -> Option<&str> {
        if self.stream != AgentStream::Lifecycle {
            return None;
        }
        self.data.get("phase").and_then(Value::as_str)
    }

    /// `data.error`, if present and not null
    pub fn error(&self) -> Option<&Value> {
        self.data.get("error").filter(|value| !value.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqGapData {
    pub reason: String,
    pub expected: u64,
    pub received: u64,
}

/// Diagnostic event emitted when a run's sequence numbers are discontinuous
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeqGapEvent {
    pub run_id: String,
    pub stream: AgentStream,
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    pub data: SeqGapData,
}

impl SeqGapEvent {
    pub fn new(
        run_id: &str,
        ts: i64,
        session_key: Option<&str>,
        expected: u64,
        received: u64,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            stream: AgentStream::Error,
            ts,
            session_key: session_key.map(str::to_string),
            data: SeqGapData {
                reason: SEQ_GAP_REASON.to_string(),
                expected,
                received,
            },
        }
    }
}

/// Payload of an `agent` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentPayload {
    Event(AgentEvent),
    SeqGap(SeqGapEvent),
}

/// A named frame leaving the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "lowercase")]
pub enum OutboundEvent {
    Agent(AgentPayload),
    Chat(ChatEvent),
}

impl OutboundEvent {
    /// Frame name as seen by consumers
    pub fn name(&self) -> &'static str {
        match self {
            Self::Agent(_) => "agent",
            Self::Chat(_) => "chat",
        }
    }

    pub fn as_chat(&self) -> Option<&ChatEvent> {
        match self {
            Self::Chat(chat) => Some(chat),
            Self::Agent(_) => None,
        }
    }

    pub fn as_agent(&self) -> Option<&AgentPayload> {
        match self {
            Self::Agent(payload) => Some(payload),
            Self::Chat(_) => None,
        }
    }
}
