use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Request to responder failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Responder did not answer within {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No message content received from AI agent")]
    NoContent,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResponderError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ResponderError::Timeout(_) => "The assistant took too long to answer. Please try again.",
            _ => "The assistant is unavailable right now. Please try again.",
        }
    }
}

pub type Result<T> = std::result::Result<T, ResponderError>;
