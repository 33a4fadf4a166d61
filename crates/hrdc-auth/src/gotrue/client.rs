// GoTrue (Supabase Auth) provider implementation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hrdc_types::{AuthEvent, AuthEventKind, AuthUser, Session};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};

use crate::artifacts::{session_key, SessionArtifactStore};
use crate::error::{AuthError, Result};
use crate::traits::IdentityProvider;

const AUTH_PATH: &str = "/auth/v1";
const EVENT_CAPACITY: usize = 64;

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));
        let mut session = Session::new(self.access_token, self.user);
        session.refresh_token = self.refresh_token;
        if let Some(token_type) = self.token_type {
            session.token_type = token_type;
        }
        session.expires_at = expires_at;
        session
    }
}

/// Identity provider backed by a GoTrue server
///
/// The session is cached in memory and mirrored as JSON into the artifact
/// store under `sb-<project>-auth-token`, so a restarted client picks it up.
pub struct GoTrueProvider {
    http_client: reqwest::Client,
    base_url: String,
    storage_key: String,
    artifacts: Arc<dyn SessionArtifactStore>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl GoTrueProvider {
    /// Create a provider for `base_url` (e.g. `https://xyz.supabase.co`)
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        artifacts: Arc<dyn SessionArtifactStore>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let anon_key = anon_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(&anon_key)
                .map_err(|_| AuthError::Config("Invalid API key format".to_string()))?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            http_client,
            storage_key: session_key(&project_ref(&base_url)),
            base_url,
            artifacts,
            session: RwLock::new(None),
            events,
        })
    }

    /// Override the artifact key the session is stored under
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Access token of the current session, if any
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}{}", self.base_url, AUTH_PATH, path);
        self.http_client.request(method, url)
    }

    /// Current access token, refreshed first once the session has expired
    async fn fresh_access_token(&self) -> Result<Option<String>> {
        let cached = self.session.read().await.clone();
        let Some(session) = cached else {
            return Ok(None);
        };
        if session.is_expired(Utc::now()) && !session.refresh_token.is_empty() {
            tracing::debug!(user_id = %session.user.id, "Refreshing expired access token");
            let refreshed = self.refresh(&session.refresh_token).await?;
            return Ok(Some(refreshed.access_token));
        }
        Ok(Some(session.access_token))
    }

    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self
            .fresh_access_token()
            .await?
            .ok_or(AuthError::NotAuthenticated)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                ["error_description", "msg", "message", "error"]
                    .iter()
                    .find_map(|field| v.get(*field).and_then(|m| m.as_str()).map(str::to_string))
            })
            .unwrap_or(body);
        tracing::debug!(status = status.as_u16(), %message, "Auth request failed");
        Err(AuthError::Provider {
            status: status.as_u16(),
            message,
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Cache and persist a new session, then announce it
    async fn store_session(&self, session: Session, kind: AuthEventKind) -> Result<()> {
        let json = serde_json::to_string(&session)?;
        self.artifacts.set(&self.storage_key, &json)?;
        *self.session.write().await = Some(session.clone());
        self.emit(AuthEvent::new(kind, Some(session)));
        Ok(())
    }

    async fn drop_session(&self) -> Result<()> {
        *self.session.write().await = None;
        self.artifacts.remove(&self.storage_key)
    }

    fn emit(&self, event: AuthEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    async fn restore_session(&self) -> Result<Option<Session>> {
        let Some(json) = self.artifacts.get(&self.storage_key)? else {
            return Ok(None);
        };
        let session: Session = serde_json::from_str(&json)?;
        *self.session.write().await = Some(session.clone());
        Ok(Some(session))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .request(Method::POST, "/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let token: TokenResponse = Self::read_json(response).await?;
        let session = token.into_session();
        self.store_session(session.clone(), AuthEventKind::TokenRefreshed)
            .await?;
        Ok(session)
    }
}

/// Project reference used in the artifact key: first label of the host
fn project_ref(base_url: &str) -> String {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .and_then(|host| host.split('.').next().map(str::to_string))
        .unwrap_or_else(|| "local".to_string())
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    async fn get_session(&self) -> Result<Option<Session>> {
        let cached = self.session.read().await.clone();
        let session = match cached {
            Some(session) => session,
            None => match self.restore_session().await? {
                Some(session) => session,
                None => return Ok(None),
            },
        };

        if session.is_expired(Utc::now()) && !session.refresh_token.is_empty() {
            tracing::debug!(user_id = %session.user.id, "Refreshing expired session");
            return self.refresh(&session.refresh_token).await.map(Some);
        }
        Ok(Some(session))
    }

    async fn get_user(&self) -> Result<Option<AuthUser>> {
        let Some(token) = self.fresh_access_token().await? else {
            return Ok(None);
        };
        let response = self
            .request(Method::GET, "/user")
            .bearer_auth(token)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        Ok(Some(Self::read_json(response).await?))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let response = self
            .request(Method::POST, "/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = Self::read_json(response).await?;
        let session = token.into_session();
        let user = session.user.clone();
        self.store_session(session, AuthEventKind::SignedIn).await?;
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str, redirect_to: Option<&str>) -> Result<AuthUser> {
        let mut request = self.request(Method::POST, "/signup");
        if let Some(redirect_to) = redirect_to {
            request = request.query(&[("redirect_to", redirect_to)]);
        }
        let response = request
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: Value = Self::read_json(response).await?;

        // With autoconfirm on the server answers with a full session,
        // otherwise with the bare (unconfirmed) user
        if body.get("access_token").is_some() {
            let session = serde_json::from_value::<TokenResponse>(body)?.into_session();
            let user = session.user.clone();
            self.store_session(session, AuthEventKind::SignedIn).await?;
            return Ok(user);
        }
        let user = match body.get("user") {
            Some(user) => serde_json::from_value(user.clone())?,
            None => serde_json::from_value(body)?,
        };
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        // a failed refresh still ends the session locally
        let token = match self.fresh_access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping server logout");
                None
            }
        };
        if let Some(token) = token {
            let response = self
                .request(Method::POST, "/logout")
                .bearer_auth(token)
                .send()
                .await?;
            Self::check_status(response).await?;
        }
        self.drop_session().await?;
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    async fn clear_local_session(&self) -> Result<()> {
        self.drop_session().await?;
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<()> {
        let response = self
            .authorized(Method::PUT, "/user")
            .await?
            .json(&json!({ "password": new_password }))
            .send()
            .await?;
        let user: AuthUser = Self::read_json(response).await?;

        let session = {
            let mut guard = self.session.write().await;
            match guard.as_mut() {
                Some(session) => {
                    session.user = user;
                    Some(session.clone())
                }
                None => None,
            }
        };
        self.emit(AuthEvent::new(AuthEventKind::UserUpdated, session));
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<()> {
        let mut request = self.request(Method::POST, "/recover");
        if let Some(redirect_to) = redirect_to {
            request = request.query(&[("redirect_to", redirect_to)]);
        }
        let response = request.json(&json!({ "email": email })).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let response = self
            .authorized(Method::DELETE, &format!("/admin/users/{}", user_id))
            .await?
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::MemoryArtifactStore;

    #[test]
    fn test_storage_key_from_host() {
        let provider = GoTrueProvider::new(
            "https://abcdefgh.supabase.co/",
            "anon",
            Arc::new(MemoryArtifactStore::new()),
        )
        .unwrap();
        assert_eq!(provider.storage_key(), "sb-abcdefgh-auth-token");
    }

    #[test]
    fn test_expires_in_becomes_expires_at() {
        let token = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            token_type: None,
            expires_in: Some(3600),
            expires_at: None,
            user: AuthUser::new("u-1", "ada@example.com"),
        };
        let before = Utc::now().timestamp();
        let session = token.into_session();
        assert!(session.expires_at.unwrap() >= before + 3600);
        assert_eq!(session.token_type, "bearer");
    }
}
