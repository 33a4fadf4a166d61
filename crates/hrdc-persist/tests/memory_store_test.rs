use chrono::{Duration, Utc};
use hrdc_persist::{
    BillingStore, ConversationStore, MemoryStore, NewMessage, NewThread, NewTransaction,
    ProfileStore, SubscriptionUpsert, UsageStore, FREE_DAILY_QUERY_LIMIT,
};
use hrdc_types::{NewProfile, PlanType, ProfileUpdate};
use serde_json::json;

#[tokio::test]
async fn test_threads_listed_most_recent_first() {
    let store = MemoryStore::new();
    let mut older = NewThread::new("u-1", "older");
    older.updated_at = Utc::now() - Duration::hours(1);
    store.insert_thread(older).await.unwrap();
    store.insert_thread(NewThread::new("u-1", "newer")).await.unwrap();
    store.insert_thread(NewThread::new("u-2", "someone else")).await.unwrap();

    let threads = store.list_threads("u-1").await.unwrap();
    let titles: Vec<_> = threads.iter().map(|t| t.title.clone().unwrap()).collect();
    assert_eq!(titles, vec!["newer", "older"]);
}

#[tokio::test]
async fn test_delete_thread_cascades_messages() {
    let store = MemoryStore::new();
    let thread = store.insert_thread(NewThread::new("u-1", "t")).await.unwrap();
    store
        .insert_message(NewMessage::user(&thread.id, "hello"))
        .await
        .unwrap();

    store.delete_thread(&thread.id).await.unwrap();
    assert!(store.thread(&thread.id).await.is_none());

    let result = store.insert_message(NewMessage::ai(&thread.id, "late")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_delete_threads_for_user_only_touches_owner() {
    let store = MemoryStore::new();
    store.insert_thread(NewThread::new("u-1", "a")).await.unwrap();
    store.insert_thread(NewThread::new("u-1", "b")).await.unwrap();
    store.insert_thread(NewThread::new("u-2", "c")).await.unwrap();

    store.delete_threads_for_user("u-1").await.unwrap();
    assert_eq!(store.thread_count("u-1").await, 0);
    assert_eq!(store.thread_count("u-2").await, 1);
}

#[tokio::test]
async fn test_profile_update_never_grants_admin() {
    let store = MemoryStore::new();
    store
        .insert_profile(NewProfile {
            id: "u-1".to_string(),
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            company: "Engines".to_string(),
            role: "Analyst".to_string(),
        })
        .await
        .unwrap();

    let update = ProfileUpdate {
        role: Some("Director".to_string()),
        ..Default::default()
    };
    let record = store.update_profile("u-1", &update).await.unwrap();
    assert_eq!(record.role.as_deref(), Some("Director"));
    assert_eq!(record.is_admin, Some(false));
}

#[tokio::test]
async fn test_free_plan_reaches_daily_limit() {
    let store = MemoryStore::new();
    for _ in 0..FREE_DAILY_QUERY_LIMIT {
        assert!(store.check_usage_limit("u-1").await.unwrap().can_query);
        store.increment_usage("u-1").await.unwrap();
    }

    let usage = store.check_usage_limit("u-1").await.unwrap();
    assert_eq!(usage.queries_today, FREE_DAILY_QUERY_LIMIT);
    assert!(usage.limit_reached);
    assert!(!usage.can_query);
}

#[tokio::test]
async fn test_standard_plan_is_unlimited() {
    let store = MemoryStore::new();
    store
        .upsert_subscription(SubscriptionUpsert {
            user_id: "u-1".to_string(),
            plan_type: PlanType::Standard,
            status: "active".to_string(),
            paystack_subscription_id: None,
            paystack_customer_id: None,
            amount_paid: 3000.0,
            currency: "KES".to_string(),
            expires_at: Utc::now() + Duration::days(30),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();
    for _ in 0..5 {
        store.increment_usage("u-1").await.unwrap();
    }

    let usage = store.check_usage_limit("u-1").await.unwrap();
    assert!(usage.can_query);
    let subscription = store.get_subscription("u-1").await.unwrap().unwrap();
    assert!(subscription.is_unlimited());
}

#[tokio::test]
async fn test_mark_transaction_success() {
    let store = MemoryStore::new();
    store
        .insert_transaction(NewTransaction {
            user_id: "u-1".to_string(),
            paystack_reference: "hrdc_u-1_1".to_string(),
            amount: 3000,
            currency: "KES".to_string(),
            status: "pending".to_string(),
            metadata: json!({ "plan_type": "standard" }),
        })
        .await
        .unwrap();

    store.mark_transaction_success("hrdc_u-1_1", "987").await.unwrap();
    let transactions = store.transactions().await;
    assert_eq!(transactions[0].status, "success");
    assert_eq!(transactions[0].paystack_transaction_id.as_deref(), Some("987"));
}
