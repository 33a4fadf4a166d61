use hrdc_types::PlanType;

/// Catalogue entry for a subscription tier
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionPlan {
    pub plan_type: PlanType,
    pub name: &'static str,
    /// Price in major currency units
    pub price: u64,
    pub currency: &'static str,
    /// Queries per day, `None` for unlimited
    pub query_limit: Option<u32>,
    pub features: &'static [&'static str],
}

pub const FREE_PLAN: SubscriptionPlan = SubscriptionPlan {
    plan_type: PlanType::Free,
    name: "Free Plan",
    price: 0,
    currency: "KES",
    query_limit: Some(2),
    features: &["2 queries per day", "Basic support"],
};

pub const STANDARD_PLAN: SubscriptionPlan = SubscriptionPlan {
    plan_type: PlanType::Standard,
    name: "Standard Plan",
    price: 3000,
    currency: "KES",
    query_limit: None,
    features: &["Unlimited queries", "Priority support", "Advanced features"],
};

impl SubscriptionPlan {
    pub fn for_type(plan_type: PlanType) -> &'static SubscriptionPlan {
        match plan_type {
            PlanType::Free => &FREE_PLAN,
            PlanType::Standard => &STANDARD_PLAN,
        }
    }

    pub fn all() -> [&'static SubscriptionPlan; 2] {
        [&FREE_PLAN, &STANDARD_PLAN]
    }

    /// Price in minor units (cents), as the payment gateway expects it
    pub fn amount_minor(&self) -> u64 {
        self.price * 100
    }

    pub fn is_unlimited(&self) -> bool {
        self.query_limit.is_none()
    }
}
