use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrdc_types::{AdminStats, NewProfile, ProfileRecord, ProfileUpdate, SubscriptionStatus, UsageStatus};

use crate::error::Result;
use crate::models::{
    MessageRecord, NewMessage, NewThread, NewTransaction, SubscriptionRecord, SubscriptionUpsert,
    ThreadRecord, TransactionRecord,
};

/// Conversation and message tables
///
/// Deleting a thread removes its messages as well.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All threads of a user with nested messages, most recently updated first
    async fn list_threads(&self, user_id: &str) -> Result<Vec<ThreadRecord>>;

    async fn insert_thread(&self, thread: NewThread) -> Result<ThreadRecord>;

    /// Rename a thread and set its `updated_at`
    async fn update_thread_title(
        &self,
        thread_id: &str,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn insert_message(&self, message: NewMessage) -> Result<MessageRecord>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Delete every thread owned by a user in one call
    async fn delete_threads_for_user(&self, user_id: &str) -> Result<()>;
}

/// The `profiles` table
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>>;

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileRecord>;

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<ProfileRecord>;

    async fn delete_profile(&self, user_id: &str) -> Result<()>;
}

/// Server-computed usage and subscription procedures
///
/// Limit enforcement lives server side; clients only read and increment.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn check_usage_limit(&self, user_id: &str) -> Result<UsageStatus>;

    async fn get_subscription(&self, user_id: &str) -> Result<Option<SubscriptionStatus>>;

    async fn increment_usage(&self, user_id: &str) -> Result<()>;
}

/// Payment transactions and subscriptions
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<TransactionRecord>;

    /// Insert or replace the subscription row of `subscription.user_id`
    async fn upsert_subscription(&self, subscription: SubscriptionUpsert) -> Result<SubscriptionRecord>;

    async fn mark_transaction_success(
        &self,
        reference: &str,
        provider_transaction_id: &str,
    ) -> Result<()>;
}

/// Read-only aggregates for administrators
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn admin_stats(&self) -> Result<AdminStats>;

    /// Newest profiles first
    async fn recent_profiles(&self, limit: usize) -> Result<Vec<ProfileRecord>>;
}
