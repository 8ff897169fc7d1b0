//! API handlers

pub mod admin;
pub mod auth;
pub mod blog;
pub mod health;
pub mod moments;

use crate::content::ContentError;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Body of the `{id}` actions (delete, toggle, approve)
#[derive(Debug, Deserialize, ToSchema)]
pub struct IdRequest {
    pub id: Uuid,
}

/// Parse a path id; anything that is not a UUID cannot name a record
pub(crate) fn parse_id(raw: &str, what: &'static str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| ContentError::NotFound(what).into())
}
