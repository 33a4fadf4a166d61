// Configuration for the responder webhook client

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request deadline for one exchange
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_defaults_when_missing() {
        let config: WebhookConfig =
            serde_json::from_str(r#"{"url": "https://agents.example.com/webhook"}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_with_timeout() {
        let config = WebhookConfig::new("http://localhost").with_timeout(Duration::from_millis(250));
        assert_eq!(config.timeout_ms, 250);
    }
}
