mod function;
mod paystack;

use async_trait::async_trait;
use hrdc_persist::SubscriptionRecord;
use serde::{Deserialize, Serialize};

pub use function::FunctionVerifier;
pub use paystack::PaystackVerifier;

use crate::error::Result;

/// Checks a completed checkout against the payment gateway
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(&self, reference: &str) -> Result<VerificationOutcome>;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub subscription: Option<SubscriptionRecord>,
}
