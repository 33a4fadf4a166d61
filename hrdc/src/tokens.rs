// Forwarding of the signed-in user's access token to HTTP collaborators

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use hrdc_auth::{IdentityProvider, SessionManager};
use hrdc_billing::FunctionVerifier;
use hrdc_types::AuthEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A client whose requests should carry the current user's access token
#[async_trait]
pub trait AccessTokenSink: Send + Sync {
    async fn set_access_token(&self, token: Option<String>);
}

#[cfg(feature = "postgrest")]
#[async_trait]
impl AccessTokenSink for hrdc_persist::PostgrestClient {
    async fn set_access_token(&self, token: Option<String>) {
        hrdc_persist::PostgrestClient::set_access_token(self, token).await
    }
}

#[async_trait]
impl AccessTokenSink for FunctionVerifier {
    async fn set_access_token(&self, token: Option<String>) {
        FunctionVerifier::set_access_token(self, token).await
    }
}

#[derive(Clone, Default)]
pub(crate) struct TokenSinks(Arc<Vec<Arc<dyn AccessTokenSink>>>);

impl TokenSinks {
    pub(crate) fn new(sinks: Vec<Arc<dyn AccessTokenSink>>) -> Self {
        Self(Arc::new(sinks))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    async fn publish(&self, token: Option<String>) {
        for sink in self.0.iter() {
            sink.set_access_token(token.clone()).await;
        }
    }

    /// Push the token of the session the provider holds right now
    pub(crate) async fn prime(&self, provider: &dyn IdentityProvider) {
        if self.is_empty() {
            return;
        }
        match provider.get_session().await {
            Ok(session) => self.publish(session.map(|s| s.access_token)).await,
            Err(e) => tracing::warn!(error = %e, "Could not read session for token forwarding"),
        }
    }
}

/// Deliver provider events to the session manager
///
/// Sinks are updated before the manager sees an event, so the profile fetch
/// that follows a sign-in already runs under the new token.
pub(crate) fn spawn_relay(
    mut events: broadcast::Receiver<AuthEvent>,
    manager: Weak<SessionManager>,
    sinks: TokenSinks,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth event relay lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let Some(manager) = manager.upgrade() else {
                break;
            };
            tracing::debug!(kind = event.kind.as_str(), "Relaying auth event");
            sinks
                .publish(event.session.as_ref().map(|s| s.access_token.clone()))
                .await;
            manager.handle_auth_event(event).await;
        }
        tracing::debug!("Auth event relay stopped");
    })
}
