use hrdc_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider returned status {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Login failed")]
    LoginFailed,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No signed-in user")]
    NotAuthenticated,

    #[error("Administrator rights required")]
    Forbidden,

    #[error("Store error: {0}")]
    Store(#[from] PersistError),

    #[error("Session artifact error: {0}")]
    Artifact(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Fixed text safe to show to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::LoginFailed => "Login failed. Please check your email and password.",
            AuthError::Validation(_) => "Please check the details you entered and try again.",
            AuthError::NotAuthenticated => "Please sign in to continue.",
            AuthError::Forbidden => "You do not have access to this page.",
            AuthError::Provider { status, .. } if *status == 422 || *status == 400 => {
                "The request could not be completed. Please check your details."
            }
            _ => "Something went wrong while contacting the server. Please try again.",
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
