// Webhook responder client (HTTP direct)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::config::WebhookConfig;
use crate::error::{ResponderError, Result};
use crate::reply::ResponderReply;
use crate::traits::{Responder, ResponderRequest};

/// Posts user messages to the responder webhook
///
/// The deadline is enforced by the HTTP client per request, so an expired
/// exchange drops the connection instead of leaving it running.
pub struct WebhookResponder {
    http_client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookResponder {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(ResponderError::Config("Webhook URL is required".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            timeout: config.timeout(),
            url: config.url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_send_error(&self, err: reqwest::Error) -> ResponderError {
        if err.is_timeout() {
            ResponderError::Timeout(self.timeout)
        } else {
            ResponderError::Http(err)
        }
    }
}

#[async_trait]
impl Responder for WebhookResponder {
    async fn respond(&self, request: ResponderRequest) -> Result<String> {
        tracing::debug!(
            conversation_id = %request.conversation_id,
            "Posting message to responder"
        );

        let response = self
            .http_client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Responder answered");

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "Responder returned an error status");
            let body = if body.is_empty() {
                "Failed to send message to AI agent".to_string()
            } else {
                body
            };
            return Err(ResponderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply = ResponderReply::parse(&body)?;
        if matches!(reply, ResponderReply::PlainText(_) | ResponderReply::Serialized(_)) {
            tracing::warn!("Responder reply had no recognized message field, using it verbatim");
        }
        Ok(reply.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_url_is_rejected() {
        let result = WebhookResponder::new(WebhookConfig::new("  "));
        let err = result.err().unwrap().to_string();
        assert!(err.contains("URL"));
    }

    #[test]
    fn test_timeout_from_config() {
        let responder =
            WebhookResponder::new(WebhookConfig::new("http://localhost/hook").with_timeout(Duration::from_secs(5)))
                .unwrap();
        assert_eq!(responder.timeout(), Duration::from_secs(5));
        assert_eq!(responder.url(), "http://localhost/hook");
    }
}
