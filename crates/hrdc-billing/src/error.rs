use hrdc_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store error: {0}")]
    Store(#[from] PersistError),

    #[error("Payment verification failed: {0}")]
    Verification(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BillingError {
    /// Fixed text safe to show to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            BillingError::Verification(_) => {
                "We could not confirm your payment. If you were charged, please contact support."
            }
            BillingError::InvalidPlan(_) => "That plan cannot be purchased.",
            _ => "Payment could not be started. Please try again.",
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
