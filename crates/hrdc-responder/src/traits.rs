use async_trait::async_trait;
use hrdc_types::Identity;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The external AI service answering user messages
///
/// One request, one reply. Implementations return the extracted reply text.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: ResponderRequest) -> Result<String>;
}

/// Body posted to the responder for each user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderRequest {
    pub message: String,
    pub user_id: String,
    pub conversation_id: String,
    pub user_profile: UserProfile,
}

/// Denormalized identity bundle sent along with each message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub company: String,
    pub role: String,
}

impl ResponderRequest {
    pub fn new(message: impl Into<String>, identity: &Identity, conversation_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            user_id: identity.id.clone(),
            conversation_id: conversation_id.into(),
            user_profile: UserProfile::from(identity),
        }
    }
}

impl From<&Identity> for UserProfile {
    fn from(identity: &Identity) -> Self {
        Self {
            name: identity.display_name(),
            email: identity.email.clone(),
            company: identity.company.clone(),
            role: identity.role.clone(),
        }
    }
}
