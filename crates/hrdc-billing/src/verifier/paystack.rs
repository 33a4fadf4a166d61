// Server-side verification against the Paystack API

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Months, Utc};
use hrdc_persist::{BillingStore, SubscriptionUpsert};
use hrdc_types::PlanType;
use serde::Deserialize;
use serde_json::Value;

use super::{PaymentVerifier, VerificationOutcome};
use crate::checkout::CheckoutMetadata;
use crate::error::{BillingError, Result};

pub const PAYSTACK_API_URL: &str = "https://api.paystack.co";

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    id: Value,
    status: String,
    /// Minor units
    amount: u64,
    currency: String,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    customer: Option<Customer>,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: Value,
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl TransactionData {
    /// Paying user: `metadata.user_id`, else the `user_id` checkout field
    fn user_id(&self) -> Option<String> {
        if let Some(id) = self.metadata.get("user_id").and_then(|v| v.as_str()) {
            return Some(id.to_string());
        }
        serde_json::from_value::<CheckoutMetadata>(self.metadata.clone())
            .ok()
            .and_then(|m| m.field("user_id").map(str::to_string))
    }
}

/// Verifies references with the secret key and activates the subscription
///
/// Runs on the trusted backend only.
pub struct PaystackVerifier {
    http_client: reqwest::Client,
    base_url: String,
    secret_key: String,
    store: Arc<dyn BillingStore>,
}

impl PaystackVerifier {
    pub fn new(secret_key: impl Into<String>, store: Arc<dyn BillingStore>) -> Result<Self> {
        let secret_key = secret_key.into();
        if secret_key.is_empty() {
            return Err(BillingError::Config("Paystack secret key not configured".to_string()));
        }
        Ok(Self {
            http_client: reqwest::Client::builder().build()?,
            base_url: PAYSTACK_API_URL.to_string(),
            secret_key,
            store,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PaymentVerifier for PaystackVerifier {
    async fn verify(&self, reference: &str) -> Result<VerificationOutcome> {
        let response = self
            .http_client
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::warn!(reference, status = response.status().as_u16(), "Paystack rejected verification");
            return Err(BillingError::Verification("Payment verification failed".to_string()));
        }

        let body: VerifyResponse = serde_json::from_str(&response.text().await?)?;
        let data = match body.data {
            Some(data) if body.status && data.status == "success" => data,
            _ => {
                tracing::info!(reference, message = ?body.message, "Payment not successful");
                return Ok(VerificationOutcome {
                    success: false,
                    message: Some("Payment verification failed".to_string()),
                    subscription: None,
                });
            }
        };

        let user_id = data
            .user_id()
            .ok_or_else(|| BillingError::Verification("Transaction carries no user id".to_string()))?;
        let now = Utc::now();
        let upsert = SubscriptionUpsert {
            user_id: user_id.clone(),
            plan_type: PlanType::Standard,
            status: "active".to_string(),
            paystack_subscription_id: Some(id_string(&data.id)),
            paystack_customer_id: data.customer.as_ref().map(|c| id_string(&c.id)),
            amount_paid: data.amount as f64 / 100.0,
            currency: data.currency.clone(),
            expires_at: now.checked_add_months(Months::new(1)).unwrap_or(now),
            updated_at: now,
        };
        let subscription = self.store.upsert_subscription(upsert).await?;
        tracing::info!(reference, user_id = %user_id, "Subscription activated");

        if let Err(e) = self
            .store
            .mark_transaction_success(reference, &id_string(&data.id))
            .await
        {
            tracing::error!(reference, error = %e, "Failed to mark transaction successful");
        }

        Ok(VerificationOutcome {
            success: true,
            message: Some("Payment verified and subscription updated".to_string()),
            subscription: Some(subscription),
        })
    }
}
