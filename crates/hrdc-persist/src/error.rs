use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[cfg(feature = "postgrest")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Empty response from store: {0}")]
    EmptyResponse(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PersistError {
    /// Fixed text safe to show to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            PersistError::ThreadNotFound(_) => "That conversation no longer exists.",
            PersistError::ProfileNotFound(_) => "Your profile could not be found.",
            _ => "We could not reach the server. Please try again.",
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
