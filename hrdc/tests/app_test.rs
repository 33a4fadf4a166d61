use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hrdc::auth::{AuthError, MemoryIdentityProvider, ProviderOp};
use hrdc::billing::{PaymentVerifier, VerificationOutcome};
use hrdc::persist::{Fault, MemoryStore, StoreOp, ThreadRecord, FREE_DAILY_QUERY_LIMIT};
use hrdc::responder::ScriptedResponder;
use hrdc::types::{AuthUser, Sender, Session};
use hrdc::{AccessTokenSink, App, AppBuilder, AppError};

struct NoPayments;

#[async_trait]
impl PaymentVerifier for NoPayments {
    async fn verify(&self, _reference: &str) -> hrdc::billing::Result<VerificationOutcome> {
        Ok(VerificationOutcome::default())
    }
}

#[derive(Default)]
struct RecordingSink {
    tokens: Mutex<Vec<Option<String>>>,
}

impl RecordingSink {
    fn last(&self) -> Option<Option<String>> {
        self.tokens.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AccessTokenSink for RecordingSink {
    async fn set_access_token(&self, token: Option<String>) {
        self.tokens.lock().unwrap().push(token);
    }
}

struct Harness {
    provider: Arc<MemoryIdentityProvider>,
    store: Arc<MemoryStore>,
    responder: Arc<ScriptedResponder>,
    app: App,
}

fn ada() -> AuthUser {
    AuthUser::new("u-ada", "ada@example.com")
}

async fn harness(metered: bool) -> Harness {
    let provider = Arc::new(MemoryIdentityProvider::new());
    provider.add_account(ada(), "secret1").await;
    let store = Arc::new(MemoryStore::new());
    let responder = Arc::new(ScriptedResponder::new());

    let mut builder = AppBuilder::new()
        .provider(provider.clone())
        .stores(store.clone())
        .responder(responder.clone());
    if metered {
        builder = builder.verifier(Arc::new(NoPayments)).payment_public_key("pk_test");
    }
    let app = builder.build().await.unwrap();

    Harness {
        provider,
        store,
        responder,
        app,
    }
}

/// Wait until the synchronizer follows the session identity
async fn settle(app: &App) {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let session_id = app.session().identity().map(|i| i.id);
            let chat_id = app.chat().identity().map(|i| i.id);
            if session_id == chat_id {
                break;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    // let the initial thread load land
    tokio::time::sleep(Duration::from_millis(20)).await;
}

async fn signed_in(metered: bool) -> Harness {
    let h = harness(metered).await;
    h.provider.restore_session(Session::new("tok-ada", ada())).await;
    h.app.start().await;
    settle(&h.app).await;
    h
}

#[tokio::test]
async fn test_build_requires_provider() {
    let result = AppBuilder::new()
        .stores(Arc::new(MemoryStore::new()))
        .responder(Arc::new(ScriptedResponder::new()))
        .build()
        .await;

    let err = result.err().unwrap().to_string();
    assert!(err.contains("identity provider"));
}

#[tokio::test]
async fn test_build_requires_responder() {
    let result = AppBuilder::new()
        .provider(Arc::new(MemoryIdentityProvider::new()))
        .stores(Arc::new(MemoryStore::new()))
        .build()
        .await;

    let err = result.err().unwrap().to_string();
    assert!(err.contains("responder"));
}

#[tokio::test]
async fn test_start_restores_session_and_loads_threads() {
    let h = harness(false).await;
    let now = Utc::now();
    h.store
        .seed_thread(ThreadRecord {
            id: "t-1".to_string(),
            user_id: "u-ada".to_string(),
            title: Some("Leave policy".to_string()),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        })
        .await;
    h.provider.restore_session(Session::new("tok-ada", ada())).await;

    h.app.start().await;

    assert!(!h.app.session().is_determining());
    assert_eq!(h.app.session().identity().unwrap().id, "u-ada");

    let mut chat = h.app.chat().subscribe();
    let state = tokio::time::timeout(Duration::from_secs(1), chat.wait_for(|s| !s.threads.is_empty()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.threads[0].title, "Leave policy");
}

#[tokio::test]
async fn test_start_without_session() {
    let h = harness(false).await;
    h.app.start().await;

    assert!(!h.app.session().is_determining());
    assert!(h.app.session().identity().is_none());
    assert!(matches!(
        h.app.submit("Hello").await,
        Err(AppError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_submit_rejects_blank_text() {
    let h = signed_in(false).await;

    let result = h.app.submit("   \n").await;

    assert!(matches!(result, Err(AppError::EmptyMessage)));
    assert!(h.responder.requests().await.is_empty());
}

#[tokio::test]
async fn test_submit_trims_and_sends() {
    let h = signed_in(false).await;
    h.responder.push_body("Hi there").await;

    let reply = h.app.submit("  Hello  ").await.unwrap();

    assert_eq!(reply.content, "Hi there");
    assert_eq!(reply.sender, Sender::Ai);
    assert_eq!(h.responder.requests().await[0].message, "Hello");
}

#[tokio::test]
async fn test_submit_stops_at_daily_limit() {
    let h = signed_in(true).await;
    for _ in 0..FREE_DAILY_QUERY_LIMIT {
        h.responder.push_body("ok").await;
        h.app.submit("question").await.unwrap();
    }

    let result = h.app.submit("one more").await;

    match result {
        Err(AppError::UsageLimitReached { queries_today }) => {
            assert_eq!(queries_today, FREE_DAILY_QUERY_LIMIT);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(h.responder.requests().await.len(), FREE_DAILY_QUERY_LIMIT as usize);
}

#[tokio::test]
async fn test_failed_usage_check_does_not_block() {
    let h = signed_in(true).await;
    h.store.inject(StoreOp::CheckUsage, Fault::Fail).await;
    h.store.inject(StoreOp::IncrementUsage, Fault::Fail).await;
    h.responder.push_body("still here").await;

    let reply = h.app.submit("Hello").await.unwrap();

    assert_eq!(reply.content, "still here");
}

#[tokio::test]
async fn test_unmetered_without_billing() {
    let h = signed_in(false).await;
    assert!(h.app.billing().is_none());

    for _ in 0..FREE_DAILY_QUERY_LIMIT + 1 {
        h.responder.push_body("ok").await;
        h.app.submit("question").await.unwrap();
    }
}

#[tokio::test]
async fn test_tokens_follow_session() {
    let provider = Arc::new(MemoryIdentityProvider::new());
    provider.add_account(ada(), "secret1").await;
    provider.restore_session(Session::new("tok-restored", ada())).await;
    let sink = Arc::new(RecordingSink::default());
    let app = AppBuilder::new()
        .provider(provider.clone())
        .stores(Arc::new(MemoryStore::new()))
        .responder(Arc::new(ScriptedResponder::new()))
        .access_token_sink(sink.clone())
        .build()
        .await
        .unwrap();

    app.start().await;
    assert_eq!(sink.last(), Some(Some("tok-restored".to_string())));

    app.session().logout().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), async {
        while sink.last() != Some(None) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let mut state = app.session().subscribe();
    app.session().login("ada@example.com", "secret1").await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), state.wait_for(|s| s.identity.is_some()))
        .await
        .unwrap()
        .unwrap();
    let session = provider.current_session().await.unwrap();
    assert_eq!(sink.last(), Some(Some(session.access_token)));
}

#[tokio::test]
async fn test_identity_cleared_on_sign_out_empties_threads() {
    let h = signed_in(false).await;
    h.responder.push_body("ok").await;
    h.app.submit("Hello").await.unwrap();
    assert_eq!(h.app.chat().threads().len(), 1);

    h.app.session().logout().await.unwrap();

    let mut chat = h.app.chat().subscribe();
    tokio::time::timeout(Duration::from_secs(1), chat.wait_for(|s| s.threads.is_empty()))
        .await
        .unwrap()
        .unwrap();
    assert!(h.app.chat().identity().is_none());
}

#[tokio::test]
async fn test_admin_overview_requires_admin() {
    let h = signed_in(false).await;

    let result = h.app.admin_overview().await;

    assert!(matches!(result, Err(AuthError::Forbidden)));
}

#[tokio::test]
async fn test_provider_failure_during_bootstrap_settles_signed_out() {
    let h = harness(false).await;
    h.provider.restore_session(Session::new("tok-ada", ada())).await;
    h.provider.fail(ProviderOp::GetUser).await;

    h.app.start().await;

    assert!(!h.app.session().is_determining());
    assert!(h.app.session().identity().is_none());
}

#[tokio::test]
async fn test_corrupted_session_withdraws_token() {
    let provider = Arc::new(MemoryIdentityProvider::new());
    provider
        .restore_session(Session::new("tok-stale", AuthUser::new("ghost", "ghost@example.com")))
        .await;
    let sink = Arc::new(RecordingSink::default());
    let app = AppBuilder::new()
        .provider(provider.clone())
        .stores(Arc::new(MemoryStore::new()))
        .responder(Arc::new(ScriptedResponder::new()))
        .access_token_sink(sink.clone())
        .build()
        .await
        .unwrap();

    app.start().await;

    tokio::time::timeout(Duration::from_secs(1), async {
        while sink.last() != Some(None) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert!(app.session().identity().is_none());
    assert!(provider.current_session().await.is_none());
}
