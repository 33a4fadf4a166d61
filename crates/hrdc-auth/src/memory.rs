//! In-process identity provider for tests and offline runs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use hrdc_types::{AuthEvent, AuthEventKind, AuthUser, Session};
use tokio::sync::{broadcast, Mutex};

use crate::error::{AuthError, Result};
use crate::traits::IdentityProvider;

const EVENT_CAPACITY: usize = 64;

/// Provider operations that can be forced to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    GetSession,
    GetUser,
    SignIn,
    SignUp,
    SignOut,
    UpdatePassword,
    ResetPassword,
    DeleteUser,
}

#[derive(Debug)]
struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Debug, Default)]
struct ProviderState {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    failing: HashSet<ProviderOp>,
    reset_requests: Vec<(String, Option<String>)>,
}

pub struct MemoryIdentityProvider {
    state: Mutex<ProviderState>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(ProviderState::default()),
            events,
        }
    }

    /// Register an account without signing it in
    pub async fn add_account(&self, user: AuthUser, password: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.accounts.insert(
            user.email.to_lowercase(),
            Account {
                user,
                password: password.into(),
            },
        );
    }

    /// Pretend a session was restored from local storage, without emitting an event
    ///
    /// The user behind it does not need to exist, which is how a stale or
    /// tampered local session looks to the client.
    pub async fn restore_session(&self, session: Session) {
        self.state.lock().await.session = Some(session);
    }

    pub async fn fail(&self, op: ProviderOp) {
        self.state.lock().await.failing.insert(op);
    }

    pub async fn heal(&self, op: ProviderOp) {
        self.state.lock().await.failing.remove(&op);
    }

    /// Push an event as if the provider had observed it
    pub fn emit(&self, event: AuthEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.state.lock().await.session.clone()
    }

    pub async fn has_account(&self, email: &str) -> bool {
        self.state.lock().await.accounts.contains_key(&email.to_lowercase())
    }

    pub async fn reset_requests(&self) -> Vec<(String, Option<String>)> {
        self.state.lock().await.reset_requests.clone()
    }

    fn check(state: &ProviderState, op: ProviderOp) -> Result<()> {
        if state.failing.contains(&op) {
            return Err(AuthError::Provider {
                status: 503,
                message: format!("{:?} unavailable", op),
            });
        }
        Ok(())
    }

    fn open_session(user: &AuthUser) -> Session {
        let mut session = Session::new(uuid::Uuid::new_v4().to_string(), user.clone());
        session.refresh_token = uuid::Uuid::new_v4().to_string();
        session.expires_at = Some(Utc::now().timestamp() + 3600);
        session
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn get_session(&self) -> Result<Option<Session>> {
        let state = self.state.lock().await;
        Self::check(&state, ProviderOp::GetSession)?;
        Ok(state.session.clone())
    }

    async fn get_user(&self) -> Result<Option<AuthUser>> {
        let state = self.state.lock().await;
        Self::check(&state, ProviderOp::GetUser)?;
        let Some(session) = &state.session else {
            return Ok(None);
        };
        Ok(state
            .accounts
            .values()
            .find(|a| a.user.id == session.user.id)
            .map(|a| a.user.clone()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let session = {
            let mut state = self.state.lock().await;
            Self::check(&state, ProviderOp::SignIn)?;
            let account = state
                .accounts
                .get_mut(&email.to_lowercase())
                .filter(|a| a.password == password)
                .ok_or_else(|| AuthError::Provider {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                })?;
            account.user.last_sign_in_at = Some(Utc::now());
            let session = Self::open_session(&account.user);
            state.session = Some(session.clone());
            session
        };

        let user = session.user.clone();
        self.emit(AuthEvent::new(AuthEventKind::SignedIn, Some(session)));
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str, _redirect_to: Option<&str>) -> Result<AuthUser> {
        let session = {
            let mut state = self.state.lock().await;
            Self::check(&state, ProviderOp::SignUp)?;
            let key = email.to_lowercase();
            if state.accounts.contains_key(&key) {
                return Err(AuthError::Provider {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }

            let now = Utc::now();
            let mut user = AuthUser::new(uuid::Uuid::new_v4().to_string(), email);
            user.created_at = Some(now);
            user.last_sign_in_at = Some(now);
            state.accounts.insert(
                key,
                Account {
                    user: user.clone(),
                    password: password.to_string(),
                },
            );
            let session = Self::open_session(&user);
            state.session = Some(session.clone());
            session
        };

        let user = session.user.clone();
        self.emit(AuthEvent::new(AuthEventKind::SignedIn, Some(session)));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            Self::check(&state, ProviderOp::SignOut)?;
            state.session = None;
        }
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    async fn clear_local_session(&self) -> Result<()> {
        self.state.lock().await.session = None;
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<()> {
        let session = {
            let mut state = self.state.lock().await;
            Self::check(&state, ProviderOp::UpdatePassword)?;
            let session = state.session.clone().ok_or(AuthError::NotAuthenticated)?;
            let account = state
                .accounts
                .values_mut()
                .find(|a| a.user.id == session.user.id)
                .ok_or(AuthError::NotAuthenticated)?;
            account.password = new_password.to_string();
            session
        };
        self.emit(AuthEvent::new(AuthEventKind::UserUpdated, Some(session)));
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, ProviderOp::ResetPassword)?;
        state
            .reset_requests
            .push((email.to_string(), redirect_to.map(str::to_string)));
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, ProviderOp::DeleteUser)?;
        state.accounts.retain(|_, a| a.user.id != user_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
