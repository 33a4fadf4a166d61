pub mod admin;
pub mod artifacts;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod gotrue;
pub mod manager;
pub mod memory;
pub mod traits;

pub use admin::{AdminDashboard, AdminOverview, RECENT_USERS_LIMIT};
pub use artifacts::{
    is_session_artifact, purge_session_artifacts, session_key, FileArtifactStore,
    MemoryArtifactStore, SessionArtifactStore,
};
pub use cleanup::{CleanupReport, CleanupStep, CleanupWarning};
pub use config::SessionConfig;
pub use error::{AuthError, Result};
pub use gotrue::GoTrueProvider;
pub use manager::{SessionManager, SessionState};
pub use memory::{MemoryIdentityProvider, ProviderOp};
pub use traits::IdentityProvider;
