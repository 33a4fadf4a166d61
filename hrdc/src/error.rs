use hrdc_chat::ChatError;
use thiserror::Error;

/// Rejections of the guarded send
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("No signed-in user")]
    NotAuthenticated,

    #[error("Daily query limit reached ({queries_today} queries today)")]
    UsageLimitReached { queries_today: u32 },

    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::EmptyMessage => "Please enter a message.",
            AppError::NotAuthenticated => "Please sign in to continue.",
            AppError::UsageLimitReached { .. } => {
                "You have used all free queries for today. Upgrade to Standard for unlimited access."
            }
            AppError::Chat(e) => e.user_message(),
        }
    }
}
