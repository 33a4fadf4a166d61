use std::sync::Arc;

use async_trait::async_trait;
use hrdc_billing::{
    BillingError, BillingService, PaymentVerifier, VerificationOutcome, FREE_PLAN,
};
use hrdc_persist::{Fault, MemoryStore, StoreOp, FREE_DAILY_QUERY_LIMIT};
use hrdc_types::{AuthUser, Identity, PlanType};

struct ApprovingVerifier;

#[async_trait]
impl PaymentVerifier for ApprovingVerifier {
    async fn verify(&self, reference: &str) -> hrdc_billing::Result<VerificationOutcome> {
        Ok(VerificationOutcome {
            success: true,
            message: Some(format!("verified {}", reference)),
            subscription: None,
        })
    }
}

fn service(store: Arc<MemoryStore>) -> BillingService {
    BillingService::new(store.clone(), store, Arc::new(ApprovingVerifier), "pk_test_123")
}

fn identity() -> Identity {
    let mut identity = Identity::minimal(&AuthUser::new("u-1", "ada@example.com"));
    identity.first_name = "Ada".to_string();
    identity.last_name = "Lovelace".to_string();
    identity
}

#[tokio::test]
async fn test_initialize_payment_builds_checkout() {
    let store = Arc::new(MemoryStore::new());
    let billing = service(store.clone());

    let init = billing
        .initialize_payment(&identity(), PlanType::Standard)
        .await
        .unwrap();

    let config = &init.config;
    assert_eq!(config.key, "pk_test_123");
    assert_eq!(config.email, "ada@example.com");
    assert_eq!(config.amount, 300_000);
    assert_eq!(config.currency, "KES");
    assert!(config.reference.starts_with("hrdc_u-1_"));
    let millis = config.reference.trim_start_matches("hrdc_u-1_");
    assert!(millis.parse::<i64>().is_ok());
    assert_eq!(config.metadata.field("plan_type"), Some("standard"));
    assert_eq!(config.metadata.field("user_id"), Some("u-1"));

    let transactions = store.transactions().await;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].status, "pending");
    assert_eq!(transactions[0].amount, 3000);
    assert_eq!(transactions[0].paystack_reference, config.reference);
    assert_eq!(transactions[0].metadata["user_name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_free_plan_cannot_be_purchased() {
    let billing = service(Arc::new(MemoryStore::new()));
    let result = billing.initialize_payment(&identity(), FREE_PLAN.plan_type).await;
    assert!(matches!(result, Err(BillingError::InvalidPlan(_))));
}

#[tokio::test]
async fn test_transaction_insert_failure_propagates() {
    let store = Arc::new(MemoryStore::new());
    store.inject(StoreOp::InsertTransaction, Fault::Fail).await;
    let billing = service(store);

    let result = billing.initialize_payment(&identity(), PlanType::Standard).await;
    assert!(matches!(result, Err(BillingError::Store(_))));
}

#[tokio::test]
async fn test_usage_counts_up_to_limit() {
    let billing = service(Arc::new(MemoryStore::new()));

    for _ in 0..FREE_DAILY_QUERY_LIMIT {
        assert!(billing.usage_status("u-1").await.can_query);
        assert!(billing.increment_usage("u-1").await);
    }

    let status = billing.usage_status("u-1").await;
    assert_eq!(status.queries_today, FREE_DAILY_QUERY_LIMIT);
    assert!(status.limit_reached);
    assert!(!status.can_query);
}

#[tokio::test]
async fn test_reads_fall_back_to_defaults() {
    let store = Arc::new(MemoryStore::new());
    store.inject(StoreOp::CheckUsage, Fault::Fail).await;
    store.inject(StoreOp::GetSubscription, Fault::Fail).await;
    store.inject(StoreOp::IncrementUsage, Fault::Fail).await;
    let billing = service(store);

    let usage = billing.usage_status("u-1").await;
    assert_eq!(usage.queries_today, 0);
    assert!(!usage.limit_reached);
    assert!(usage.can_query);

    let subscription = billing.subscription("u-1").await;
    assert_eq!(subscription.plan_type, PlanType::Free);
    assert_eq!(subscription.status, "active");
    assert!(subscription.is_active);

    assert!(!billing.increment_usage("u-1").await);
}

#[tokio::test]
async fn test_verify_delegates_to_verifier() {
    let billing = service(Arc::new(MemoryStore::new()));
    let outcome = billing.verify_payment("hrdc_u-1_1").await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("verified hrdc_u-1_1"));
}
