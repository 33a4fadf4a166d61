use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Bound on every store read and write
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Outer bound on one responder exchange; the call is dropped on expiry
    #[serde(default = "default_responder_timeout_ms")]
    pub responder_timeout_ms: u64,
}

fn default_store_timeout_ms() -> u64 {
    3_000
}

fn default_responder_timeout_ms() -> u64 {
    20_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout_ms(),
            responder_timeout_ms: default_responder_timeout_ms(),
        }
    }
}

impl SyncConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn responder_timeout(&self) -> Duration {
        Duration::from_millis(self.responder_timeout_ms)
    }
}
