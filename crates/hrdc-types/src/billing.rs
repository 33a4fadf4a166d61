use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    #[default]
    Free,
    Standard,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Standard => "standard",
        }
    }
}

/// Result of the server-side `check_usage_limit` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStatus {
    pub queries_today: u32,
    pub limit_reached: bool,
    pub can_query: bool,
}

impl Default for UsageStatus {
    /// Permissive value used when the usage tables cannot be read
    fn default() -> Self {
        Self {
            queries_today: 0,
            limit_reached: false,
            can_query: true,
        }
    }
}

/// Result of the server-side `get_user_subscription` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub plan_type: PlanType,
    pub status: String,
    pub is_active: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self {
            plan_type: PlanType::Free,
            status: "active".to_string(),
            is_active: true,
            expires_at: None,
        }
    }
}

impl SubscriptionStatus {
    pub fn is_unlimited(&self) -> bool {
        self.plan_type == PlanType::Standard && self.is_active
    }
}

/// Aggregates from the `admin_stats` view
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdminStats {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_conversations: u64,
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub users_this_month: u64,
}
