use chrono::{DateTime, Utc};
use hrdc_types::{Message, Thread, DEFAULT_THREAD_TITLE};
use serde::{Deserialize, Serialize};

use super::MessageRecord;

/// Row of the `conversations` table, optionally with its nested messages
///
/// The nested `messages` come back in whatever order the store chooses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

/// Insert payload for the `conversations` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThread {
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewThread {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

// Conversion: ThreadRecord → hrdc_types::Thread, messages re-sorted ascending
impl From<ThreadRecord> for Thread {
    fn from(record: ThreadRecord) -> Self {
        let mut thread = Thread {
            id: record.id,
            title: record
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_THREAD_TITLE.to_string()),
            created_at: record.created_at,
            updated_at: record.updated_at,
            messages: record.messages.into_iter().map(Message::from).collect(),
        };
        thread.sort_messages();
        thread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRecord;
    use chrono::Duration;
    use hrdc_types::Sender;

    fn row(id: &str, at: DateTime<Utc>) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            conversation_id: "t-1".to_string(),
            content: id.to_string(),
            sender: Sender::User,
            is_error: None,
            created_at: at,
        }
    }

    #[test]
    fn test_record_into_thread_sorts_messages() {
        let now = Utc::now();
        let record = ThreadRecord {
            id: "t-1".to_string(),
            user_id: "u-1".to_string(),
            title: None,
            created_at: now,
            updated_at: now,
            messages: vec![row("late", now + Duration::seconds(5)), row("early", now)],
        };

        let thread = Thread::from(record);

        assert_eq!(thread.title, DEFAULT_THREAD_TITLE);
        assert_eq!(thread.messages[0].id, "early");
        assert_eq!(thread.messages[1].id, "late");
        assert!(!thread.messages[0].is_error);
    }
}
