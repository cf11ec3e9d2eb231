//! Chat payloads delivered to chat clients

use serde::{Deserialize, Serialize};

/// Emission state of a chat payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatState {
    Delta,
    Final,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Chat message carried by delta and final payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn assistant_text(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
            timestamp,
        }
    }

    /// Concatenated text of all text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.as_str(),
            })
            .collect()
    }
}

/// `chat` frame payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    pub run_id: String,
    pub session_key: String,
    pub seq: u64,
    pub state: ChatState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ChatEvent {
    pub fn delta(run_id: &str, session_key: &str, seq: u64, text: &str, now: i64) -> Self {
        Self {
            run_id: run_id.to_string(),
            session_key: session_key.to_string(),
            seq,
            state: ChatState::Delta,
            message: Some(ChatMessage::assistant_text(text, now)),
            error_message: None,
        }
    }

    /// Final payload; the message is omitted when `text` is empty
    pub fn final_text(run_id: &str, session_key: &str, seq: u64, text: &str, now: i64) -> Self {
        Self {
            run_id: run_id.to_string(),
            session_key: session_key.to_string(),
            seq,
            state: ChatState::Final,
            message: (!text.is_empty()).then(|| ChatMessage::assistant_text(text, now)),
            error_message: None,
        }
    }

    pub fn error(run_id: &str, session_key: &str, seq: u64, error_message: Option<String>) -> Self {
        Self {
            run_id: run_id.to_string(),
            session_key: session_key.to_string(),
            seq,
            state: ChatState::Error,
            message: None,
            error_message,
        }
    }
}
