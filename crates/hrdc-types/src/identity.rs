use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;

/// The authenticated actor as understood by the client
///
/// `is_admin` is only ever copied from a [`ProfileRecord`] read back from the
/// store. None of the client-writable types carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub email_confirmed: bool,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub role: String,
    pub is_admin: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Identity {
    /// Identity built from the provider user alone, all profile fields empty
    pub fn minimal(user: &AuthUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            email_confirmed: user.email_confirmed(),
            first_name: String::new(),
            last_name: String::new(),
            company: String::new(),
            role: String::new(),
            is_admin: false,
            created_at: user.created_at,
            last_login: user.last_sign_in_at,
        }
    }

    /// Merge a profile record; present, non-empty fields win
    pub fn with_profile(self, profile: &ProfileRecord) -> Self {
        fn pick(value: &Option<String>, fallback: String) -> String {
            match value {
                Some(v) if !v.is_empty() => v.clone(),
                _ => fallback,
            }
        }

        Self {
            email: pick(&profile.email, self.email),
            first_name: pick(&profile.first_name, self.first_name),
            last_name: pick(&profile.last_name, self.last_name),
            company: pick(&profile.company, self.company),
            role: pick(&profile.role, self.role),
            is_admin: profile.is_admin.unwrap_or(false),
            created_at: profile.created_at.or(self.created_at),
            last_login: profile.last_login.or(self.last_login),
            ..self
        }
    }

    /// Carry profile-derived fields over from an identity of the same actor
    pub fn keep_profile_of(self, previous: &Identity) -> Self {
        if previous.id != self.id {
            return self;
        }
        Self {
            first_name: previous.first_name.clone(),
            last_name: previous.last_name.clone(),
            company: previous.company.clone(),
            role: previous.role.clone(),
            is_admin: previous.is_admin,
            ..self
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Row of the `profiles` table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

/// Profile row written right after sign-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub role: String,
}

/// Owner-editable profile fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.company.is_none()
            && self.role.is_none()
    }

    /// Apply onto a stored record, leaving untouched fields as they were
    pub fn apply_to(&self, record: &mut ProfileRecord) {
        if let Some(v) = &self.first_name {
            record.first_name = Some(v.clone());
        }
        if let Some(v) = &self.last_name {
            record.last_name = Some(v.clone());
        }
        if let Some(v) = &self.company {
            record.company = Some(v.clone());
        }
        if let Some(v) = &self.role {
            record.role = Some(v.clone());
        }
    }
}
