use chrono::{DateTime, Utc};
use hrdc_types::PlanType;
use serde::{Deserialize, Serialize};

/// Insert payload for the `payment_transactions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: String,
    pub paystack_reference: String,
    /// Major currency units
    pub amount: u64,
    pub currency: String,
    pub status: String,
    pub metadata: serde_json::Value,
}

/// Row of the `payment_transactions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub user_id: String,
    pub paystack_reference: String,
    pub amount: u64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub paystack_transaction_id: Option<String>,
}

/// Upsert payload for the `subscriptions` table, keyed by `user_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionUpsert {
    pub user_id: String,
    pub plan_type: PlanType,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paystack_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paystack_customer_id: Option<String>,
    pub amount_paid: f64,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `subscriptions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: String,
    pub plan_type: PlanType,
    pub status: String,
    #[serde(default)]
    pub amount_paid: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<SubscriptionUpsert> for SubscriptionRecord {
    fn from(upsert: SubscriptionUpsert) -> Self {
        Self {
            user_id: upsert.user_id,
            plan_type: upsert.plan_type,
            status: upsert.status,
            amount_paid: Some(upsert.amount_paid),
            currency: Some(upsert.currency),
            expires_at: Some(upsert.expires_at),
        }
    }
}
