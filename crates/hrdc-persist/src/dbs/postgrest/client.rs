// PostgREST-specific store implementation (Supabase REST API)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrdc_types::{
    AdminStats, NewProfile, ProfileRecord, ProfileUpdate, SubscriptionStatus, UsageStatus,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{
    MessageRecord, NewMessage, NewThread, NewTransaction, SubscriptionRecord, SubscriptionUpsert,
    ThreadRecord, TransactionRecord,
};
use crate::trait_client::{AdminStore, BillingStore, ConversationStore, ProfileStore, UsageStore};

const REST_PATH: &str = "/rest/v1";
const PREFER_RETURN: &str = "return=representation";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=representation";

/// Store client talking to a PostgREST endpoint
///
/// Requests carry the anon key as `apikey` and, once a user signs in, the
/// user's access token as bearer so row-level security applies.
pub struct PostgrestClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: RwLock<Option<String>>,
}

impl PostgrestClient {
    /// Create a new client for `base_url` (e.g. `https://xyz.supabase.co`)
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(&api_key)
                .map_err(|_| PersistError::Config("Invalid API key format".to_string()))?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            access_token: RwLock::new(None),
        })
    }

    /// Use a user's access token for subsequent requests (or fall back to the key)
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}{}", self.base_url, REST_PATH, path);
        let bearer = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.api_key.clone());
        self.http_client.request(method, url).bearer_auth(bearer)
    }

    async fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, &format!("/{}", table)).await
    }

    /// Check status and decode the JSON body
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(body);
        tracing::debug!(status = status.as_u16(), %message, "Store request failed");
        Err(PersistError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// First row of a `return=representation` response
    async fn single<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let rows: Vec<T> = Self::read_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PersistError::EmptyResponse(what.to_string()))
    }

    async fn rpc(&self, name: &str, user_id: &str) -> Result<Response> {
        let response = self
            .request(Method::POST, &format!("/rpc/{}", name))
            .await
            .json(&json!({ "user_id": user_id }))
            .send()
            .await?;
        Self::check_status(response).await
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl ConversationStore for PostgrestClient {
    async fn list_threads(&self, user_id: &str) -> Result<Vec<ThreadRecord>> {
        let response = self
            .table(Method::GET, "conversations")
            .await
            .query(&[
                ("select", "*,messages(*)".to_string()),
                ("user_id", eq(user_id)),
                ("order", "updated_at.desc".to_string()),
            ])
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn insert_thread(&self, thread: NewThread) -> Result<ThreadRecord> {
        let response = self
            .table(Method::POST, "conversations")
            .await
            .header("Prefer", PREFER_RETURN)
            .json(&thread)
            .send()
            .await?;
        Self::single(response, "conversations insert").await
    }

    async fn update_thread_title(
        &self,
        thread_id: &str,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let response = self
            .table(Method::PATCH, "conversations")
            .await
            .query(&[("id", eq(thread_id))])
            .json(&json!({ "title": title, "updated_at": updated_at }))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn insert_message(&self, message: NewMessage) -> Result<MessageRecord> {
        let response = self
            .table(Method::POST, "messages")
            .await
            .header("Prefer", PREFER_RETURN)
            .json(&message)
            .send()
            .await?;
        Self::single(response, "messages insert").await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let response = self
            .table(Method::DELETE, "conversations")
            .await
            .query(&[("id", eq(thread_id))])
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete_threads_for_user(&self, user_id: &str) -> Result<()> {
        let response = self
            .table(Method::DELETE, "conversations")
            .await
            .query(&[("user_id", eq(user_id))])
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PostgrestClient {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>> {
        let response = self
            .table(Method::GET, "profiles")
            .await
            .query(&[("select", "*".to_string()), ("id", eq(user_id))])
            .send()
            .await?;
        let rows: Vec<ProfileRecord> = Self::read_json(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileRecord> {
        let response = self
            .table(Method::POST, "profiles")
            .await
            .header("Prefer", PREFER_RETURN)
            .json(&profile)
            .send()
            .await?;
        Self::single(response, "profiles insert").await
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<ProfileRecord> {
        let response = self
            .table(Method::PATCH, "profiles")
            .await
            .header("Prefer", PREFER_RETURN)
            .query(&[("id", eq(user_id))])
            .json(update)
            .send()
            .await?;
        let rows: Vec<ProfileRecord> = Self::read_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PersistError::ProfileNotFound(user_id.to_string()))
    }

    async fn delete_profile(&self, user_id: &str) -> Result<()> {
        let response = self
            .table(Method::DELETE, "profiles")
            .await
            .query(&[("id", eq(user_id))])
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl UsageStore for PostgrestClient {
    async fn check_usage_limit(&self, user_id: &str) -> Result<UsageStatus> {
        let response = self.rpc("check_usage_limit", user_id).await?;
        let rows: Vec<UsageStatus> = Self::read_json(response).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn get_subscription(&self, user_id: &str) -> Result<Option<SubscriptionStatus>> {
        let response = self.rpc("get_user_subscription", user_id).await?;
        let rows: Vec<SubscriptionStatus> = Self::read_json(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn increment_usage(&self, user_id: &str) -> Result<()> {
        self.rpc("increment_usage_count", user_id).await?;
        Ok(())
    }
}

#[async_trait]
impl BillingStore for PostgrestClient {
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<TransactionRecord> {
        let response = self
            .table(Method::POST, "payment_transactions")
            .await
            .header("Prefer", PREFER_RETURN)
            .json(&transaction)
            .send()
            .await?;
        Self::single(response, "payment_transactions insert").await
    }

    async fn upsert_subscription(&self, subscription: SubscriptionUpsert) -> Result<SubscriptionRecord> {
        let response = self
            .table(Method::POST, "subscriptions")
            .await
            .header("Prefer", PREFER_UPSERT)
            .query(&[("on_conflict", "user_id")])
            .json(&subscription)
            .send()
            .await?;
        Self::single(response, "subscriptions upsert").await
    }

    async fn mark_transaction_success(
        &self,
        reference: &str,
        provider_transaction_id: &str,
    ) -> Result<()> {
        let response = self
            .table(Method::PATCH, "payment_transactions")
            .await
            .query(&[("paystack_reference", eq(reference))])
            .json(&json!({
                "status": "success",
                "paystack_transaction_id": provider_transaction_id,
                "updated_at": Utc::now(),
            }))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AdminStore for PostgrestClient {
    async fn admin_stats(&self) -> Result<AdminStats> {
        let response = self
            .table(Method::GET, "admin_stats")
            .await
            .query(&[("select", "*")])
            .send()
            .await?;
        Self::single(response, "admin_stats").await
    }

    async fn recent_profiles(&self, limit: usize) -> Result<Vec<ProfileRecord>> {
        let response = self
            .table(Method::GET, "profiles")
            .await
            .query(&[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = PostgrestClient::new("https://xyz.supabase.co/", "anon").unwrap();
        assert_eq!(client.base_url(), "https://xyz.supabase.co");
    }

    #[test]
    fn test_invalid_api_key_is_rejected() {
        let result = PostgrestClient::new("https://xyz.supabase.co", "bad\nkey");
        assert!(matches!(result, Err(PersistError::Config(_))));
    }
}
