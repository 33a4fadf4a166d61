pub mod auth;
pub mod billing;
pub mod conversation;
pub mod identity;

pub use auth::{AuthEvent, AuthEventKind, AuthUser, Registration, Session};
pub use billing::{AdminStats, PlanType, SubscriptionStatus, UsageStatus};
pub use conversation::{derive_title, Message, Sender, Thread, DEFAULT_THREAD_TITLE, TITLE_MAX_CHARS};
pub use identity::{Identity, NewProfile, ProfileRecord, ProfileUpdate};
