use std::time::Duration;

use hrdc_persist::PersistError;
use hrdc_responder::ResponderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Store error: {0}")]
    Store(#[from] PersistError),

    #[error("Responder error: {0}")]
    Responder(#[from] ResponderError),

    #[error("Store operation {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("No signed-in user")]
    NotAuthenticated,
}

impl ChatError {
    /// Fixed text safe to show to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::Store(e) => e.user_message(),
            ChatError::Responder(e) => e.user_message(),
            ChatError::Timeout { .. } => "We could not reach the server. Please try again.",
            ChatError::NotAuthenticated => "Please sign in to continue.",
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
