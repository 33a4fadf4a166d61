use config::{Config as ConfigLoader, ConfigError, Environment, File};
use hrdc::auth::SessionConfig;
use hrdc::chat::SyncConfig;
use hrdc::responder::WebhookConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub supabase: SupabaseConfig,
    pub responder: WebhookConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub supabase_anon_key: String,
    #[serde(default)]
    pub paystack_public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted provider session
    pub artifacts_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables prefixed `HRDC_`, sections split by `__`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("HRDC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Load secrets from ENV (not in TOML)
        cfg.supabase_anon_key = std::env::var("SUPABASE_ANON_KEY").map_err(|_| {
            ConfigError::Message("SUPABASE_ANON_KEY environment variable is required".to_string())
        })?;
        cfg.paystack_public_key = std::env::var("PAYSTACK_PUBLIC_KEY").unwrap_or_default();

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [supabase]
            url = "https://abc.supabase.co"

            [responder]
            url = "https://agents.example.com/webhook"

            [sync]
            store_timeout_ms = 1500

            [storage]
            artifacts_dir = "/tmp/hrdc"

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.supabase.url, "https://abc.supabase.co");
        assert_eq!(config.responder.timeout(), Duration::from_secs(20));
        assert_eq!(config.sync.store_timeout(), Duration::from_millis(1500));
        assert_eq!(config.sync.responder_timeout(), Duration::from_secs(20));
        assert_eq!(config.session.profile_timeout(), Duration::from_millis(2500));
        assert!(config.supabase_anon_key.is_empty());
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let toml = r#"
            [supabase]
            url = "https://abc.supabase.co"
        "#;

        assert!(toml::from_str::<Config>(toml).is_err());
    }
}
