use std::sync::Arc;

use hrdc_persist::AdminStore;
use hrdc_types::{AdminStats, Identity, ProfileRecord};

use crate::error::{AuthError, Result};

/// How many recent sign-ups the dashboard lists
pub const RECENT_USERS_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminOverview {
    pub stats: AdminStats,
    pub recent_users: Vec<ProfileRecord>,
}

/// Read-only dashboard for administrators
pub struct AdminDashboard {
    store: Arc<dyn AdminStore>,
}

impl AdminDashboard {
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self { store }
    }

    /// Aggregates and recent users; read failures degrade to empty values
    pub async fn overview(&self, identity: Option<&Identity>) -> Result<AdminOverview> {
        let identity = identity.ok_or(AuthError::NotAuthenticated)?;
        if !identity.is_admin {
            tracing::warn!(user_id = %identity.id, "Non-admin requested the admin dashboard");
            return Err(AuthError::Forbidden);
        }

        let stats = match self.store.admin_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load admin stats");
                AdminStats::default()
            }
        };
        let recent_users = match self.store.recent_profiles(RECENT_USERS_LIMIT).await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load recent users");
                Vec::new()
            }
        };

        Ok(AdminOverview {
            stats,
            recent_users,
        })
    }
}
