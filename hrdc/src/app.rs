//! The assembled chat core

use std::sync::{Arc, Mutex};

use hrdc_auth::{AdminDashboard, AdminOverview, IdentityProvider, SessionManager};
use hrdc_billing::BillingService;
use hrdc_chat::ConversationSynchronizer;
use hrdc_types::Message;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::tokens::{spawn_relay, TokenSinks};

/// Session manager and conversation synchronizer wired to each other
///
/// Built with [`AppBuilder`](crate::builder::AppBuilder). Nothing runs until
/// [`start`](Self::start) is called.
pub struct App {
    pub(crate) provider: Arc<dyn IdentityProvider>,
    pub(crate) session: Arc<SessionManager>,
    pub(crate) chat: Arc<ConversationSynchronizer>,
    pub(crate) billing: Option<BillingService>,
    pub(crate) admin: Option<AdminDashboard>,
    pub(crate) tokens: TokenSinks,
    pub(crate) tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl App {
    /// Subscribe to provider events, follow the identity and run bootstrap
    ///
    /// Returns once the initial identity is settled. The conversation load
    /// it triggers continues in the background.
    pub async fn start(&self) {
        let relay = spawn_relay(
            self.provider.subscribe(),
            Arc::downgrade(&self.session),
            self.tokens.clone(),
        );
        let binding = self
            .chat
            .bind(self.session.subscribe(), |state| state.identity.clone());
        self.track(relay);
        self.track(binding);

        self.tokens.prime(self.provider.as_ref()).await;
        self.session.bootstrap().await;
        tracing::info!(
            authenticated = self.session.identity().is_some(),
            "Chat core started"
        );
    }

    fn track(&self, handle: JoinHandle<()>) {
        match self.tasks.lock() {
            Ok(mut tasks) => tasks.push(handle),
            Err(poisoned) => poisoned.into_inner().push(handle),
        }
    }

    /// Send `text` into the selected thread, honoring the daily quota
    pub async fn submit(&self, text: &str) -> Result<Message, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::EmptyMessage);
        }
        let identity = self.session.identity().ok_or(AppError::NotAuthenticated)?;

        if let Some(billing) = &self.billing {
            let usage = billing.usage_status(&identity.id).await;
            if !usage.can_query {
                tracing::info!(user_id = %identity.id, queries_today = usage.queries_today, "Query limit reached");
                return Err(AppError::UsageLimitReached {
                    queries_today: usage.queries_today,
                });
            }
            billing.increment_usage(&identity.id).await;
        }

        Ok(self.chat.send_message(text, None).await?)
    }

    /// Dashboard data for the signed-in administrator
    pub async fn admin_overview(&self) -> hrdc_auth::Result<AdminOverview> {
        let admin = self.admin.as_ref().ok_or(hrdc_auth::AuthError::Forbidden)?;
        admin.overview(self.session.identity().as_ref()).await
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn chat(&self) -> &Arc<ConversationSynchronizer> {
        &self.chat
    }

    pub fn billing(&self) -> Option<&BillingService> {
        self.billing.as_ref()
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let tasks = match self.tasks.get_mut() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}
