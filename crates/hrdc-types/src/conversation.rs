use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_THREAD_TITLE: &str = "New Conversation";

/// Maximum number of characters kept when deriving a title
pub const TITLE_MAX_CHARS: usize = 50;

const TITLE_ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

/// One turn in a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
    /// Set only on the synthetic apology appended after a failed exchange
    #[serde(default)]
    pub is_error: bool,
}

/// Named, ordered container of messages owned by one identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Thread {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Stable sort by creation time, ascending
    pub fn sort_messages(&mut self) {
        self.messages.sort_by_key(|m| m.created_at);
    }

    /// Copy of this thread with `message` appended and `updated_at` bumped
    pub fn with_message(&self, message: Message, updated_at: DateTime<Utc>) -> Self {
        let mut thread = self.clone();
        thread.messages.push(message);
        thread.updated_at = updated_at;
        thread
    }
}

/// Title derived from the first user message of a thread
///
/// Keeps the first [`TITLE_MAX_CHARS`] characters and appends `...` when the
/// text was longer.
pub fn derive_title(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}{}", head, TITLE_ELLIPSIS)
    } else {
        head
    }
}
