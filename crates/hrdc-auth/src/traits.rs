use async_trait::async_trait;
use hrdc_types::{AuthEvent, AuthUser, Session};
use tokio::sync::broadcast;

use crate::error::Result;

/// External identity/session provider
///
/// Providers emit an [`AuthEvent`] for every session change they observe,
/// whether caused by a call on this trait or by a background refresh.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session the provider currently holds, restoring it from local storage if needed
    async fn get_session(&self) -> Result<Option<Session>>;

    /// The user behind the current session, verified with the provider
    async fn get_user(&self) -> Result<Option<AuthUser>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn sign_up(&self, email: &str, password: &str, redirect_to: Option<&str>) -> Result<AuthUser>;

    async fn sign_out(&self) -> Result<()>;

    /// Forget the local session without contacting the server
    ///
    /// Emits a session-less [`AuthEvent`] so token holders drop the bearer.
    async fn clear_local_session(&self) -> Result<()>;

    async fn update_password(&self, new_password: &str) -> Result<()>;

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<()>;

    /// Remove the provider-side account record
    async fn delete_user(&self, user_id: &str) -> Result<()>;

    /// Receive future session-change events
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
