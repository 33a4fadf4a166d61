// Client-side verification through the `verify-payment` server function

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::{PaymentVerifier, VerificationOutcome};
use crate::error::{BillingError, Result};

const FUNCTION_PATH: &str = "/functions/v1/verify-payment";

/// Asks the trusted backend to verify a reference
///
/// Holds only the public anon key and the user's access token.
pub struct FunctionVerifier {
    http_client: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl FunctionVerifier {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let anon_key = anon_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(&anon_key)
                .map_err(|_| BillingError::Config("Invalid API key format".to_string()))?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key,
            access_token: RwLock::new(None),
        })
    }

    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }
}

#[async_trait]
impl PaymentVerifier for FunctionVerifier {
    async fn verify(&self, reference: &str) -> Result<VerificationOutcome> {
        let bearer = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());

        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, FUNCTION_PATH))
            .bearer_auth(bearer)
            .json(&json!({ "reference": reference }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    ["error", "message"]
                        .iter()
                        .find_map(|f| v.get(*f).and_then(|m| m.as_str()).map(str::to_string))
                })
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::warn!(reference, status = status.as_u16(), %message, "Payment verification rejected");
            return Err(BillingError::Verification(message));
        }

        Ok(serde_json::from_str(&body)?)
    }
}
