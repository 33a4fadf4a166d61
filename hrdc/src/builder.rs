//! High-level builder API for assembling the chat core

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use hrdc_auth::{
    AdminDashboard, IdentityProvider, MemoryArtifactStore, SessionArtifactStore, SessionConfig,
    SessionManager,
};
use hrdc_billing::{BillingService, PaymentVerifier};
use hrdc_chat::{ConversationSynchronizer, SyncConfig};
use hrdc_persist::{AdminStore, BillingStore, ConversationStore, ProfileStore, UsageStore};
use hrdc_responder::{Responder, WebhookConfig, WebhookResponder};

use crate::app::App;
use crate::tokens::{AccessTokenSink, TokenSinks};

#[cfg(feature = "postgrest")]
struct SupabaseSettings {
    url: String,
    anon_key: String,
}

/// Builder wiring identity provider, stores and responder into an [`App`]
///
/// # Example
///
/// ```rust,no_run
/// use hrdc::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let app = AppBuilder::new()
///     .supabase("https://xyz.supabase.co", "anon-key")
///     .responder_url("https://agents.customcx.com/webhook/HDRC")
///     .payment_public_key("pk_live_...")
///     .build()
///     .await?;
/// app.start().await;
/// # Ok(())
/// # }
/// ```
///
/// Explicitly set collaborators always win over the ones derived from
/// [`supabase`](Self::supabase).
pub struct AppBuilder {
    provider: Option<Arc<dyn IdentityProvider>>,
    artifacts: Option<Arc<dyn SessionArtifactStore>>,

    // Stores
    conversations: Option<Arc<dyn ConversationStore>>,
    profiles: Option<Arc<dyn ProfileStore>>,
    usage: Option<Arc<dyn UsageStore>>,
    billing_store: Option<Arc<dyn BillingStore>>,
    admin_store: Option<Arc<dyn AdminStore>>,

    // Responder
    responder: Option<Arc<dyn Responder>>,
    webhook: Option<WebhookConfig>,

    // Billing
    verifier: Option<Arc<dyn PaymentVerifier>>,
    payment_public_key: String,

    session_config: SessionConfig,
    sync_config: SyncConfig,
    token_sinks: Vec<Arc<dyn AccessTokenSink>>,

    #[cfg(feature = "postgrest")]
    supabase: Option<SupabaseSettings>,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            artifacts: None,
            conversations: None,
            profiles: None,
            usage: None,
            billing_store: None,
            admin_store: None,
            responder: None,
            webhook: None,
            verifier: None,
            payment_public_key: String::new(),
            session_config: SessionConfig::default(),
            sync_config: SyncConfig::default(),
            token_sinks: Vec::new(),
            #[cfg(feature = "postgrest")]
            supabase: None,
        }
    }

    /// Use a Supabase project for identity, storage and payment verification
    #[cfg(feature = "postgrest")]
    pub fn supabase(mut self, url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        self.supabase = Some(SupabaseSettings {
            url: url.into(),
            anon_key: anon_key.into(),
        });
        self
    }

    pub fn provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Where the provider keeps its session (default: in memory)
    pub fn artifacts(mut self, artifacts: Arc<dyn SessionArtifactStore>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Use one backend for every store role
    pub fn stores<S>(mut self, store: Arc<S>) -> Self
    where
        S: ConversationStore + ProfileStore + UsageStore + BillingStore + AdminStore + 'static,
    {
        self.conversations = Some(store.clone());
        self.profiles = Some(store.clone());
        self.usage = Some(store.clone());
        self.billing_store = Some(store.clone());
        self.admin_store = Some(store);
        self
    }

    pub fn conversation_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.conversations = Some(store);
        self
    }

    pub fn profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(store);
        self
    }

    pub fn usage_store(mut self, store: Arc<dyn UsageStore>) -> Self {
        self.usage = Some(store);
        self
    }

    pub fn responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Post messages to the webhook at `url` with the default deadline
    pub fn responder_url(mut self, url: impl Into<String>) -> Self {
        self.webhook = Some(WebhookConfig::new(url));
        self
    }

    pub fn webhook(mut self, config: WebhookConfig) -> Self {
        self.webhook = Some(config);
        self
    }

    /// Enables the usage quota and checkout together with the billing stores
    pub fn verifier(mut self, verifier: Arc<dyn PaymentVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn payment_public_key(mut self, key: impl Into<String>) -> Self {
        self.payment_public_key = key.into();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }

    /// Keep `sink` on the signed-in user's access token
    pub fn access_token_sink(mut self, sink: Arc<dyn AccessTokenSink>) -> Self {
        self.token_sinks.push(sink);
        self
    }

    /// Build the app
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - no identity provider, conversation store, profile store or responder
    ///   is configured (directly or through `supabase`)
    /// - a Supabase or webhook client cannot be constructed
    pub async fn build(mut self) -> Result<App> {
        let artifacts: Arc<dyn SessionArtifactStore> = self
            .artifacts
            .take()
            .unwrap_or_else(|| Arc::new(MemoryArtifactStore::new()));
        #[allow(unused_mut)]
        let mut sinks = std::mem::take(&mut self.token_sinks);

        #[cfg(feature = "postgrest")]
        if let Some(supabase) = self.supabase.take() {
            self.apply_supabase(supabase, &artifacts, &mut sinks).await?;
        }

        let provider = self
            .provider
            .context("An identity provider is required. Call .provider(..) or .supabase(url, anon_key)")?;
        let conversations = self
            .conversations
            .context("A conversation store is required. Call .stores(..) or .supabase(url, anon_key)")?;
        let profiles = self
            .profiles
            .context("A profile store is required. Call .stores(..) or .supabase(url, anon_key)")?;
        let responder: Arc<dyn Responder> = match (self.responder, self.webhook) {
            (Some(responder), _) => responder,
            (None, Some(config)) => Arc::new(
                WebhookResponder::new(config).context("Failed to create webhook responder")?,
            ),
            (None, None) => anyhow::bail!("A responder is required. Call .responder_url(url)"),
        };

        let billing = match (self.verifier, self.billing_store, self.usage) {
            (Some(verifier), Some(billing_store), Some(usage)) => Some(BillingService::new(
                billing_store,
                usage,
                verifier,
                self.payment_public_key,
            )),
            _ => {
                tracing::info!("Billing not configured, queries are not metered");
                None
            }
        };

        let session = Arc::new(SessionManager::new(
            Arc::clone(&provider),
            profiles,
            Arc::clone(&conversations),
            artifacts,
            self.session_config,
        ));
        let chat = Arc::new(ConversationSynchronizer::new(
            conversations,
            responder,
            self.sync_config,
        ));

        Ok(App {
            provider,
            session,
            chat,
            billing,
            admin: self.admin_store.map(AdminDashboard::new),
            tokens: TokenSinks::new(sinks),
            tasks: Mutex::new(Vec::new()),
        })
    }

    #[cfg(feature = "postgrest")]
    async fn apply_supabase(
        &mut self,
        supabase: SupabaseSettings,
        artifacts: &Arc<dyn SessionArtifactStore>,
        sinks: &mut Vec<Arc<dyn AccessTokenSink>>,
    ) -> Result<()> {
        use hrdc_auth::GoTrueProvider;
        use hrdc_billing::FunctionVerifier;
        use hrdc_persist::StoreBuilder;

        if self.provider.is_none() {
            let provider = GoTrueProvider::new(&supabase.url, &supabase.anon_key, Arc::clone(artifacts))
                .context("Failed to create identity provider")?;
            self.provider = Some(Arc::new(provider));
        }

        let store = Arc::new(
            StoreBuilder::new()
                .url(&supabase.url)
                .api_key(&supabase.anon_key)
                .build()
                .await
                .context("Failed to create store client")?,
        );
        sinks.push(store.clone());
        if self.conversations.is_none() {
            self.conversations = Some(store.clone());
        }
        if self.profiles.is_none() {
            self.profiles = Some(store.clone());
        }
        if self.usage.is_none() {
            self.usage = Some(store.clone());
        }
        if self.billing_store.is_none() {
            self.billing_store = Some(store.clone());
        }
        if self.admin_store.is_none() {
            self.admin_store = Some(store);
        }

        if self.verifier.is_none() {
            let verifier = Arc::new(
                FunctionVerifier::new(&supabase.url, &supabase.anon_key)
                    .context("Failed to create payment verifier")?,
            );
            sinks.push(verifier.clone());
            self.verifier = Some(verifier);
        }

        tracing::info!(url = %supabase.url, "Supabase collaborators configured");
        Ok(())
    }
}
