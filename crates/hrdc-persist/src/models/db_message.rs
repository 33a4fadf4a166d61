use chrono::{DateTime, Utc};
use hrdc_types::{Message, Sender};
use serde::{Deserialize, Serialize};

/// Row of the `messages` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub sender: Sender,
    #[serde(default)]
    pub is_error: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `messages` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub content: String,
    pub sender: Sender,
    pub is_error: bool,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    pub fn user(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
            sender: Sender::User,
            is_error: false,
            created_at: Utc::now(),
        }
    }

    pub fn ai(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            ..Self::user(conversation_id, content)
        }
    }

    pub fn ai_error(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::ai(conversation_id, content)
        }
    }
}

// Conversion: MessageRecord → hrdc_types::Message
impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Message {
            id: record.id,
            content: record.content,
            sender: record.sender,
            created_at: record.created_at,
            is_error: record.is_error.unwrap_or(false),
        }
    }
}
