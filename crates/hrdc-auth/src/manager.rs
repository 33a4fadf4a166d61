//! The session manager: single writer of the current [`Identity`].
//!
//! State is published on a `watch` channel as [`SessionState`]. Consumers
//! either poll [`SessionManager::identity`] or hold a receiver from
//! [`SessionManager::subscribe`] and react to changes.

use std::sync::{Arc, Weak};

use hrdc_persist::{ConversationStore, ProfileStore};
use hrdc_types::{AuthEvent, AuthEventKind, AuthUser, Identity, NewProfile, ProfileUpdate, Registration};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::artifacts::{purge_session_artifacts, SessionArtifactStore};
use crate::cleanup::{CleanupReport, CleanupStep};
use crate::config::SessionConfig;
use crate::error::{AuthError, Result};
use crate::traits::IdentityProvider;

const MIN_PASSWORD_LEN: usize = 6;

/// Published session state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    /// True until the first bootstrap has settled
    pub determining: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            determining: true,
        }
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    conversations: Arc<dyn ConversationStore>,
    artifacts: Arc<dyn SessionArtifactStore>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        conversations: Arc<dyn ConversationStore>,
        artifacts: Arc<dyn SessionArtifactStore>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            provider,
            profiles,
            conversations,
            artifacts,
            config,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn is_determining(&self) -> bool {
        self.state.borrow().determining
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Listen for provider events in a background task
    ///
    /// Call before [`bootstrap`](Self::bootstrap) so no event is missed.
    /// The task ends once the manager is dropped or the provider closes
    /// its event stream.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.provider.subscribe();
        let manager: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth event listener lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.handle_auth_event(event).await;
            }
            tracing::debug!("Auth event listener stopped");
        })
    }

    /// Settle the initial identity from the locally held session
    pub async fn bootstrap(&self) {
        if let Err(e) = self.bootstrap_inner().await {
            tracing::warn!(error = %e, "Session bootstrap failed, treating session as corrupted");
            self.discard_corrupted_session().await;
        }
        self.state.send_if_modified(|state| {
            let changed = state.determining;
            state.determining = false;
            changed
        });
    }

    async fn bootstrap_inner(&self) -> Result<()> {
        let session = self.provider.get_session().await?;
        let Some(session) = session else {
            tracing::debug!("No stored session");
            self.set_identity(None);
            return Ok(());
        };

        match self.provider.get_user().await {
            Ok(Some(user)) if user.id == session.user.id => {
                self.enrich(&user).await;
            }
            Ok(Some(user)) => {
                tracing::warn!(
                    session_user = %session.user.id,
                    verified_user = %user.id,
                    "Session user mismatch"
                );
                self.discard_corrupted_session().await;
            }
            Ok(None) => {
                tracing::warn!(user_id = %session.user.id, "Session user could not be verified");
                self.discard_corrupted_session().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session verification failed");
                self.discard_corrupted_session().await;
            }
        }
        Ok(())
    }

    async fn discard_corrupted_session(&self) {
        if let Err(e) = purge_session_artifacts(self.artifacts.as_ref()) {
            tracing::error!(error = %e, "Failed to purge session artifacts");
        }
        if let Err(e) = self.provider.clear_local_session().await {
            tracing::error!(error = %e, "Failed to clear provider session");
        }
        self.set_identity(None);
    }

    /// React to one provider event
    pub async fn handle_auth_event(&self, event: AuthEvent) {
        tracing::debug!(kind = event.kind.as_str(), "Auth event");
        match event.session {
            Some(session) => self.enrich(&session.user).await,
            None => {
                self.set_identity(None);
                if event.kind == AuthEventKind::SignedOut {
                    if let Err(e) = purge_session_artifacts(self.artifacts.as_ref()) {
                        tracing::error!(error = %e, "Failed to purge session artifacts");
                    }
                }
            }
        }
    }

    /// Publish a minimal identity now, then merge the profile once fetched
    pub async fn enrich(&self, user: &AuthUser) {
        let minimal = Identity::minimal(user);
        let immediate = match self.identity() {
            Some(previous) => minimal.clone().keep_profile_of(&previous),
            None => minimal.clone(),
        };
        self.set_identity(Some(immediate));

        let fetched =
            tokio::time::timeout(self.config.profile_timeout(), self.profiles.get_profile(&user.id))
                .await;
        let profile = match fetched {
            Ok(Ok(Some(profile))) => profile,
            Ok(Ok(None)) => {
                tracing::debug!(user_id = %user.id, "No profile record, keeping minimal identity");
                return;
            }
            Ok(Err(e)) => {
                tracing::warn!(user_id = %user.id, error = %e, "Profile fetch failed, keeping minimal identity");
                return;
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %user.id,
                    timeout_ms = self.config.profile_timeout_ms,
                    "Profile fetch timed out, keeping minimal identity"
                );
                return;
            }
        };

        let merged = minimal.with_profile(&profile);
        if !self.replace_if_current(merged) {
            tracing::debug!(user_id = %user.id, "Identity changed during enrichment, dropping profile");
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser> {
        match self.provider.sign_in(email.trim(), password).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Signed in");
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-in failed");
                Err(AuthError::LoginFailed)
            }
        }
    }

    pub async fn register(&self, registration: Registration) -> Result<AuthUser> {
        let email = registration.email.trim().to_string();
        validate_email(&email)?;
        validate_password(&registration.password)?;

        let user = self
            .provider
            .sign_up(&email, &registration.password, self.config.redirect_url.as_deref())
            .await?;
        tracing::info!(user_id = %user.id, "Account created");

        let profile = NewProfile {
            id: user.id.clone(),
            email,
            first_name: registration.first_name,
            last_name: registration.last_name,
            company: registration.company,
            role: registration.role,
        };
        if let Err(e) = self.profiles.insert_profile(profile).await {
            tracing::warn!(user_id = %user.id, error = %e, "Profile insert failed after sign-up");
        }
        Ok(user)
    }

    pub async fn logout(&self) -> Result<()> {
        self.provider.sign_out().await?;
        self.set_identity(None);
        tracing::info!("Signed out");
        Ok(())
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Identity> {
        let identity = self.identity().ok_or(AuthError::NotAuthenticated)?;
        if update.is_empty() {
            return Ok(identity);
        }

        let record = self.profiles.update_profile(&identity.id, &update).await?;
        let merged = identity.with_profile(&record);
        self.replace_if_current(merged.clone());
        Ok(merged)
    }

    pub async fn update_password(&self, new_password: &str) -> Result<()> {
        validate_password(new_password)?;
        self.provider.update_password(new_password).await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let email = email.trim();
        validate_email(email)?;
        self.provider
            .reset_password_for_email(email, self.config.redirect_url.as_deref())
            .await
    }

    /// Remove the account and everything it owns, step by step
    ///
    /// Each step is attempted regardless of earlier failures. The identity is
    /// cleared at the end in every case.
    pub async fn delete_account(&self) -> Result<CleanupReport> {
        let identity = self.identity().ok_or(AuthError::NotAuthenticated)?;
        let user_id = identity.id.as_str();
        tracing::info!(user_id, "Deleting account");

        let mut report = CleanupReport::default();
        for step in CleanupStep::ORDER {
            let outcome = match step {
                CleanupStep::Conversations => self
                    .conversations
                    .delete_threads_for_user(user_id)
                    .await
                    .map_err(AuthError::from),
                CleanupStep::Profile => self
                    .profiles
                    .delete_profile(user_id)
                    .await
                    .map_err(AuthError::from),
                CleanupStep::AuthRecord => self.provider.delete_user(user_id).await,
                CleanupStep::SignOut => self.provider.sign_out().await,
                CleanupStep::Artifacts => {
                    purge_session_artifacts(self.artifacts.as_ref()).map(|_| ())
                }
            };
            report.record(step, outcome);
        }

        self.set_identity(None);
        if !report.is_clean() {
            tracing::warn!(user_id, warnings = report.warnings.len(), "Account deleted with warnings");
        }
        Ok(report)
    }

    fn set_identity(&self, identity: Option<Identity>) {
        self.state.send_if_modified(|state| {
            if state.identity == identity {
                return false;
            }
            state.identity = identity;
            true
        });
    }

    /// Publish `identity` only while its id is still the current one
    fn replace_if_current(&self, identity: Identity) -> bool {
        let mut replaced = false;
        self.state.send_if_modified(|state| match &state.identity {
            Some(current) if current.id == identity.id => {
                replaced = true;
                if *current == identity {
                    return false;
                }
                state.identity = Some(identity);
                true
            }
            _ => false,
        });
        replaced
    }
}

fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation("a valid email address is required".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_rules() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada.example.com").is_err());
        assert!(validate_email("").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
    }

    #[test]
    fn test_initial_state_is_determining() {
        let state = SessionState::default();
        assert!(state.determining);
        assert!(!state.is_authenticated());
    }
}
