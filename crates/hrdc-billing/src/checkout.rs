use chrono::{DateTime, Utc};
use hrdc_persist::TransactionRecord;
use serde::{Deserialize, Serialize};

/// Settings handed to the client-side checkout widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Public key only; the secret key never leaves the backend
    pub key: String,
    pub email: String,
    /// Minor currency units
    pub amount: u64,
    pub currency: String,
    pub reference: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub custom_fields: Vec<CustomField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub display_name: String,
    pub variable_name: String,
    pub value: String,
}

impl CustomField {
    pub fn new(display_name: &str, variable_name: &str, value: impl Into<String>) -> Self {
        Self {
            display_name: display_name.to_string(),
            variable_name: variable_name.to_string(),
            value: value.into(),
        }
    }
}

impl CheckoutMetadata {
    pub fn field(&self, variable_name: &str) -> Option<&str> {
        self.custom_fields
            .iter()
            .find(|f| f.variable_name == variable_name)
            .map(|f| f.value.as_str())
    }
}

/// Checkout settings plus the pending transaction row backing them
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInit {
    pub config: CheckoutConfig,
    pub transaction: TransactionRecord,
}

/// Unique reference for one payment attempt
pub fn payment_reference(user_id: &str, at: DateTime<Utc>) -> String {
    format!("hrdc_{}_{}", user_id, at.timestamp_millis())
}
