use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on the profile fetch run during enrichment
    #[serde(default = "default_profile_timeout_ms")]
    pub profile_timeout_ms: u64,

    /// Where password-reset and confirmation links should land
    #[serde(default)]
    pub redirect_url: Option<String>,
}

fn default_profile_timeout_ms() -> u64 {
    2_500
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile_timeout_ms: default_profile_timeout_ms(),
            redirect_url: None,
        }
    }
}

impl SessionConfig {
    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    pub fn profile_timeout(&self) -> Duration {
        Duration::from_millis(self.profile_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.profile_timeout(), Duration::from_millis(2500));
        assert!(config.redirect_url.is_none());
    }

    #[test]
    fn test_partial_deserialize() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"redirect_url": "https://app.example.com/reset"}"#).unwrap();
        assert_eq!(config.profile_timeout_ms, 2500);
        assert_eq!(config.redirect_url.as_deref(), Some("https://app.example.com/reset"));
    }
}
