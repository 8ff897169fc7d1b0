//! Credential records and auth request/response bodies

use chrono::{DateTime, Utc};
use moments_core::{Role, UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stored credential record for a non-admin account
///
/// The administrator is not stored here; it comes from configuration.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2id PHC string; never serialized
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role,
            created_at: Utc::now(),
        }
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: Some(self.id.to_string()),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: Some(self.created_at),
        }
    }
}

/// Login request (admin and user)
///
/// Fields are optional so an absent field reports `missing_input` instead of
/// a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// `reader` (default) or `author`
    #[serde(default)]
    pub role: Option<Role>,
}

/// Successful login or registration
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

/// Current account profile
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
}
