//! Chat and message model shared across the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

impl Role {
    /// Filename component for audio artifacts (`user_...` / `agent_...`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
        }
    }
}

/// How a message was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Audio,
}

/// Persona of the agent answering in a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub system_prompt: String,
}

/// A persisted conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: u64,
    pub name: String,
    pub agent: AgentProfile,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Next message id to allocate. Ids are monotonically increasing per
    /// chat and double as the pagination cursor.
    pub next_message_id: u64,
}

/// A persisted message. `(role, modality)` is immutable after creation;
/// `text` may be backfilled with the transcript of an audio message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub chat_id: u64,
    pub role: Role,
    pub modality: Modality,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn is_audio(&self) -> bool {
        self.modality == Modality::Audio
    }
}

/// One submitted user turn: chat id plus exactly one of `text` /
/// `audio_message_id` (a previously ingested audio upload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub chat_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_message_id: Option<u64>,
}

impl TurnRequest {
    pub fn text(chat_id: u64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: Some(text.into()),
            audio_message_id: None,
        }
    }

    pub fn audio(chat_id: u64, audio_message_id: u64) -> Self {
        Self {
            chat_id,
            text: None,
            audio_message_id: Some(audio_message_id),
        }
    }
}

/// Message shape handed to display clients. Audio messages carry no text
/// here even when a transcript is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: u64,
    pub sent_at: DateTime<Utc>,
    pub sender: Role,
    pub is_audio: bool,
    pub text: String,
}

impl From<&Message> for MessageView {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id,
            sent_at: msg.sent_at,
            sender: msg.role,
            is_audio: msg.is_audio(),
            text: if msg.is_audio() {
                String::new()
            } else {
                msg.text.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(modality: Modality, text: &str) -> Message {
        Message {
            id: 1,
            chat_id: 1,
            role: Role::User,
            modality,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_blanks_audio_text() {
        let view = MessageView::from(&msg(Modality::Audio, "transcript kept internally"));
        assert!(view.is_audio);
        assert!(view.text.is_empty());
    }

    #[test]
    fn test_view_keeps_text_for_text_messages() {
        let view = MessageView::from(&msg(Modality::Text, "hello"));
        assert!(!view.is_audio);
        assert_eq!(view.text, "hello");
    }
}
