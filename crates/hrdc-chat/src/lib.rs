pub mod config;
pub mod error;
pub mod state;
pub mod synchronizer;

pub use config::SyncConfig;
pub use error::{ChatError, Result};
pub use state::{ChatState, SendPhase};
pub use synchronizer::{ConversationSynchronizer, APOLOGY_MESSAGE};
