use crate::dbs::postgrest::PostgrestClient;
use crate::error::{PersistError, Result};

/// Builder for a [`PostgrestClient`]
pub struct StoreBuilder {
    url: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            url: None,
            api_key: None,
            access_token: None,
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub async fn build(self) -> Result<PostgrestClient> {
        let url = self
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PersistError::Config("url is required".to_string()))?;
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PersistError::Config("api_key is required".to_string()))?;

        let client = PostgrestClient::new(url, api_key)?;
        if self.access_token.is_some() {
            client.set_access_token(self.access_token).await;
        }
        Ok(client)
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
