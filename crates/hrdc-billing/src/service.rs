use std::sync::Arc;

use chrono::Utc;
use hrdc_persist::{BillingStore, NewTransaction, UsageStore};
use hrdc_types::{Identity, PlanType, SubscriptionStatus, UsageStatus};
use serde_json::json;

use crate::checkout::{payment_reference, CheckoutConfig, CheckoutMetadata, CustomField, PaymentInit};
use crate::error::{BillingError, Result};
use crate::plans::SubscriptionPlan;
use crate::verifier::{PaymentVerifier, VerificationOutcome};

/// Client-side billing operations
///
/// Reads degrade to permissive defaults when the store is unreachable, so a
/// billing outage never locks a user out of the chat.
pub struct BillingService {
    billing: Arc<dyn BillingStore>,
    usage: Arc<dyn UsageStore>,
    verifier: Arc<dyn PaymentVerifier>,
    public_key: String,
}

impl BillingService {
    pub fn new(
        billing: Arc<dyn BillingStore>,
        usage: Arc<dyn UsageStore>,
        verifier: Arc<dyn PaymentVerifier>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            billing,
            usage,
            verifier,
            public_key: public_key.into(),
        }
    }

    /// Record a pending transaction and build the checkout settings for it
    pub async fn initialize_payment(&self, identity: &Identity, plan_type: PlanType) -> Result<PaymentInit> {
        let plan = SubscriptionPlan::for_type(plan_type);
        if plan.price == 0 {
            return Err(BillingError::InvalidPlan(format!("{} requires no payment", plan.name)));
        }
        if self.public_key.is_empty() {
            return Err(BillingError::Config("payment public key not configured".to_string()));
        }

        let reference = payment_reference(&identity.id, Utc::now());
        let transaction = self
            .billing
            .insert_transaction(NewTransaction {
                user_id: identity.id.clone(),
                paystack_reference: reference.clone(),
                amount: plan.price,
                currency: plan.currency.to_string(),
                status: "pending".to_string(),
                metadata: json!({
                    "plan_type": plan_type.as_str(),
                    "user_email": identity.email,
                    "user_name": identity.display_name(),
                }),
            })
            .await?;
        tracing::info!(user_id = %identity.id, reference = %reference, plan = plan_type.as_str(), "Payment initialized");

        let config = CheckoutConfig {
            key: self.public_key.clone(),
            email: identity.email.clone(),
            amount: plan.amount_minor(),
            currency: plan.currency.to_string(),
            reference,
            metadata: CheckoutMetadata {
                custom_fields: vec![
                    CustomField::new("Plan Type", "plan_type", plan_type.as_str()),
                    CustomField::new("User ID", "user_id", identity.id.clone()),
                ],
            },
        };
        Ok(PaymentInit {
            config,
            transaction,
        })
    }

    pub async fn verify_payment(&self, reference: &str) -> Result<VerificationOutcome> {
        self.verifier.verify(reference).await
    }

    pub async fn usage_status(&self, user_id: &str) -> UsageStatus {
        match self.usage.check_usage_limit(user_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Usage check failed, allowing query");
                UsageStatus::default()
            }
        }
    }

    pub async fn subscription(&self, user_id: &str) -> SubscriptionStatus {
        match self.usage.get_subscription(user_id).await {
            Ok(Some(status)) => status,
            Ok(None) => SubscriptionStatus::default(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Subscription lookup failed, assuming free plan");
                SubscriptionStatus::default()
            }
        }
    }

    /// Count one query; `false` when the counter could not be updated
    pub async fn increment_usage(&self, user_id: &str) -> bool {
        match self.usage.increment_usage(user_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to increment usage");
                false
            }
        }
    }
}
