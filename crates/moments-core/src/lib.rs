//! Moments Core - shared domain types
//!
//! This crate holds what both sides of the auth boundary agree on:
//! - The closed set of account roles
//! - The token claim layout and the client-side (unverified) decoder
//! - The public profile shape returned by the API
//! - Configuration management
//! - Common error types

pub mod config;
pub mod token;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use token::{
    has_compact_shape, TokenClaims, TokenDecodeError, UnverifiedClaims, ACCESS_TOKEN_TTL_SECS,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types shared across crates
#[derive(Error, Debug)]
pub enum MomentsError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    TokenDecode(#[from] TokenDecodeError),
}

pub type Result<T> = std::result::Result<T, MomentsError>;

// ============================================================================
// Roles
// ============================================================================

/// Account role
///
/// The set is closed: every authorization decision matches on this enum,
/// never on free-form strings.
/// - Admin: the single configured operator account
/// - Author: may create and manage their own blog posts
/// - Reader: may read and hold a session, nothing more
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Author,
    Reader,
}

impl Role {
    /// All roles, in descending privilege order
    pub const ALL: [Role; 3] = [Role::Admin, Role::Author, Role::Reader];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Author => "author",
            Role::Reader => "reader",
        }
    }

    /// Roles a visitor may pick for themselves at registration
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, Role::Author | Role::Reader)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MomentsError;

    /// Parsing is exact: `"Admin"` is not a role.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "author" => Ok(Role::Author),
            "reader" => Ok(Role::Reader),
            other => Err(MomentsError::UnknownRole(other.to_string())),
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

/// Public account profile
///
/// Returned by login, registration and `/api/auth/me`, and cached by the
/// client session next to the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    /// Account id; the admin account has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Profile of the configured administrator
    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: "Administrator".to_string(),
            email: email.into(),
            role: Role::Admin,
            created_at: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
