//! In-process store used by tests, demos and offline runs.
//!
//! Mirrors the relational schema closely enough that the services above it
//! cannot tell the difference: thread deletion cascades to messages, usage is
//! counted per calendar day, and every operation can be made to fail or stall
//! through [`MemoryStore::inject`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hrdc_types::{
    AdminStats, NewProfile, ProfileRecord, ProfileUpdate, SubscriptionStatus, UsageStatus,
};
use tokio::sync::Mutex;

use crate::error::{PersistError, Result};
use crate::models::{
    MessageRecord, NewMessage, NewThread, NewTransaction, SubscriptionRecord, SubscriptionUpsert,
    ThreadRecord, TransactionRecord,
};
use crate::trait_client::{AdminStore, BillingStore, ConversationStore, ProfileStore, UsageStore};

/// Queries per calendar day allowed on the free plan
pub const FREE_DAILY_QUERY_LIMIT: u32 = 2;

/// Store operations that can carry an injected [`Fault`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListThreads,
    InsertThread,
    UpdateThreadTitle,
    InsertMessage,
    DeleteThread,
    DeleteThreadsForUser,
    GetProfile,
    InsertProfile,
    UpdateProfile,
    DeleteProfile,
    CheckUsage,
    GetSubscription,
    IncrementUsage,
    InsertTransaction,
    UpsertSubscription,
    MarkTransaction,
    AdminStats,
    RecentProfiles,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Fail every call
    Fail,
    /// Fail only the next call
    FailOnce,
    /// Sleep before answering
    Delay(Duration),
    /// Sleep only for calls touching this user or thread id
    DelayFor(String, Duration),
}

#[derive(Debug, Default)]
struct MemoryState {
    threads: HashMap<String, ThreadRecord>,
    profiles: HashMap<String, ProfileRecord>,
    usage: HashMap<(String, NaiveDate), u32>,
    subscriptions: HashMap<String, SubscriptionRecord>,
    transactions: Vec<TransactionRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    faults: Mutex<HashMap<StoreOp, Fault>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fault to an operation, replacing any previous one
    pub async fn inject(&self, op: StoreOp, fault: Fault) {
        self.faults.lock().await.insert(op, fault);
    }

    pub async fn clear_faults(&self) {
        self.faults.lock().await.clear();
    }

    /// Insert a thread with pre-built message rows, stored in the given order
    pub async fn seed_thread(&self, thread: ThreadRecord) {
        self.state.lock().await.threads.insert(thread.id.clone(), thread);
    }

    pub async fn seed_profile(&self, profile: ProfileRecord) {
        self.state.lock().await.profiles.insert(profile.id.clone(), profile);
    }

    pub async fn thread(&self, thread_id: &str) -> Option<ThreadRecord> {
        self.state.lock().await.threads.get(thread_id).cloned()
    }

    pub async fn thread_count(&self, user_id: &str) -> usize {
        self.state
            .lock()
            .await
            .threads
            .values()
            .filter(|t| t.user_id == user_id)
            .count()
    }

    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.state.lock().await.transactions.clone()
    }

    async fn check(&self, op: StoreOp, key: &str) -> Result<()> {
        let fault = {
            let mut faults = self.faults.lock().await;
            match faults.get(&op).cloned() {
                Some(Fault::FailOnce) => {
                    faults.remove(&op);
                    Some(Fault::FailOnce)
                }
                other => other,
            }
        };

        match fault {
            None => Ok(()),
            Some(Fault::Fail) | Some(Fault::FailOnce) => {
                Err(PersistError::Unavailable(format!("{:?} failed", op)))
            }
            Some(Fault::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Some(Fault::DelayFor(target, delay)) => {
                if target == key {
                    tokio::time::sleep(delay).await;
                }
                Ok(())
            }
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn is_unlimited(state: &MemoryState, user_id: &str, now: DateTime<Utc>) -> bool {
        state
            .subscriptions
            .get(user_id)
            .map(|s| {
                s.plan_type == hrdc_types::PlanType::Standard
                    && s.status == "active"
                    && s.expires_at.map(|exp| exp > now).unwrap_or(true)
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn list_threads(&self, user_id: &str) -> Result<Vec<ThreadRecord>> {
        self.check(StoreOp::ListThreads, user_id).await?;
        let state = self.state.lock().await;
        let mut threads: Vec<ThreadRecord> = state
            .threads
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(threads)
    }

    async fn insert_thread(&self, thread: NewThread) -> Result<ThreadRecord> {
        self.check(StoreOp::InsertThread, &thread.user_id).await?;
        let record = ThreadRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: thread.user_id,
            title: Some(thread.title),
            created_at: thread.created_at,
            updated_at: thread.updated_at,
            messages: Vec::new(),
        };
        self.state
            .lock()
            .await
            .threads
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_thread_title(
        &self,
        thread_id: &str,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check(StoreOp::UpdateThreadTitle, thread_id).await?;
        let mut state = self.state.lock().await;
        let thread = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        thread.title = Some(title.to_string());
        thread.updated_at = updated_at;
        Ok(())
    }

    async fn insert_message(&self, message: NewMessage) -> Result<MessageRecord> {
        self.check(StoreOp::InsertMessage, &message.conversation_id).await?;
        let mut state = self.state.lock().await;
        let thread = state
            .threads
            .get_mut(&message.conversation_id)
            .ok_or_else(|| PersistError::ThreadNotFound(message.conversation_id.clone()))?;

        let record = MessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: message.conversation_id,
            content: message.content,
            sender: message.sender,
            is_error: Some(message.is_error),
            created_at: message.created_at,
        };
        thread.messages.push(record.clone());
        Ok(record)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.check(StoreOp::DeleteThread, thread_id).await?;
        self.state.lock().await.threads.remove(thread_id);
        Ok(())
    }

    async fn delete_threads_for_user(&self, user_id: &str) -> Result<()> {
        self.check(StoreOp::DeleteThreadsForUser, user_id).await?;
        self.state
            .lock()
            .await
            .threads
            .retain(|_, t| t.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>> {
        self.check(StoreOp::GetProfile, user_id).await?;
        Ok(self.state.lock().await.profiles.get(user_id).cloned())
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileRecord> {
        self.check(StoreOp::InsertProfile, &profile.id).await?;
        let now = Utc::now();
        let record = ProfileRecord {
            id: profile.id,
            email: Some(profile.email),
            first_name: Some(profile.first_name),
            last_name: Some(profile.last_name),
            company: Some(profile.company),
            role: Some(profile.role),
            is_admin: Some(false),
            created_at: Some(now),
            last_login: Some(now),
        };
        self.state
            .lock()
            .await
            .profiles
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<ProfileRecord> {
        self.check(StoreOp::UpdateProfile, user_id).await?;
        let mut state = self.state.lock().await;
        let record = state
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| PersistError::ProfileNotFound(user_id.to_string()))?;
        update.apply_to(record);
        Ok(record.clone())
    }

    async fn delete_profile(&self, user_id: &str) -> Result<()> {
        self.check(StoreOp::DeleteProfile, user_id).await?;
        self.state.lock().await.profiles.remove(user_id);
        Ok(())
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn check_usage_limit(&self, user_id: &str) -> Result<UsageStatus> {
        self.check(StoreOp::CheckUsage, user_id).await?;
        let state = self.state.lock().await;
        let queries_today = state
            .usage
            .get(&(user_id.to_string(), Self::today()))
            .copied()
            .unwrap_or(0);
        let limit_reached = !Self::is_unlimited(&state, user_id, Utc::now())
            && queries_today >= FREE_DAILY_QUERY_LIMIT;
        Ok(UsageStatus {
            queries_today,
            limit_reached,
            can_query: !limit_reached,
        })
    }

    async fn get_subscription(&self, user_id: &str) -> Result<Option<SubscriptionStatus>> {
        self.check(StoreOp::GetSubscription, user_id).await?;
        let state = self.state.lock().await;
        let now = Utc::now();
        Ok(state.subscriptions.get(user_id).map(|s| SubscriptionStatus {
            plan_type: s.plan_type,
            status: s.status.clone(),
            is_active: Self::is_unlimited(&state, user_id, now),
            expires_at: s.expires_at,
        }))
    }

    async fn increment_usage(&self, user_id: &str) -> Result<()> {
        self.check(StoreOp::IncrementUsage, user_id).await?;
        let mut state = self.state.lock().await;
        *state
            .usage
            .entry((user_id.to_string(), Self::today()))
            .or_insert(0) += 1;
        Ok(())
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<TransactionRecord> {
        self.check(StoreOp::InsertTransaction, &transaction.user_id).await?;
        let record = TransactionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: transaction.user_id,
            paystack_reference: transaction.paystack_reference,
            amount: transaction.amount,
            currency: transaction.currency,
            status: transaction.status,
            metadata: transaction.metadata,
            paystack_transaction_id: None,
        };
        self.state.lock().await.transactions.push(record.clone());
        Ok(record)
    }

    async fn upsert_subscription(&self, subscription: SubscriptionUpsert) -> Result<SubscriptionRecord> {
        self.check(StoreOp::UpsertSubscription, &subscription.user_id).await?;
        let record = SubscriptionRecord::from(subscription);
        self.state
            .lock()
            .await
            .subscriptions
            .insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    async fn mark_transaction_success(
        &self,
        reference: &str,
        provider_transaction_id: &str,
    ) -> Result<()> {
        self.check(StoreOp::MarkTransaction, reference).await?;
        let mut state = self.state.lock().await;
        for tx in state
            .transactions
            .iter_mut()
            .filter(|t| t.paystack_reference == reference)
        {
            tx.status = "success".to_string();
            tx.paystack_transaction_id = Some(provider_transaction_id.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn admin_stats(&self) -> Result<AdminStats> {
        self.check(StoreOp::AdminStats, "").await?;
        let state = self.state.lock().await;
        let now = Utc::now();
        let users_this_month = state
            .profiles
            .values()
            .filter_map(|p| p.created_at)
            .filter(|c| c.format("%Y-%m").to_string() == now.format("%Y-%m").to_string())
            .count();
        Ok(AdminStats {
            total_users: state.profiles.len() as u64,
            total_conversations: state.threads.len() as u64,
            total_messages: state.threads.values().map(|t| t.messages.len() as u64).sum(),
            users_this_month: users_this_month as u64,
        })
    }

    async fn recent_profiles(&self, limit: usize) -> Result<Vec<ProfileRecord>> {
        self.check(StoreOp::RecentProfiles, "").await?;
        let state = self.state.lock().await;
        let mut profiles: Vec<ProfileRecord> = state.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        profiles.truncate(limit);
        Ok(profiles)
    }
}
