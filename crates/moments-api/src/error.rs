//! API error handling
//!
//! Every failure leaves the server as the same JSON envelope:
//! `{"success": false, "code": "...", "message": "...", "hint": "..."}`.
//! The `code` field is machine-readable so clients branch on it instead of
//! matching message text.

use crate::auth::credentials::CredentialError;
use crate::auth::jwt::TokenError;
use crate::auth::middleware::AuthRejection;
use crate::auth::password::PasswordError;
use crate::auth::repository::RepositoryError;
use crate::content::ContentError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always `false`
    pub success: bool,
    /// Machine-readable error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// How to fix the request, when there is something to say
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Rejected by the authentication middleware or the role guard
    Auth(AuthRejection),
    MissingInput,
    InvalidCredentials,
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    /// Server misconfiguration; detail is logged, never returned
    Configuration(String),
    /// Unexpected failure; detail is logged, never returned
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(rejection) => rejection.status(),
            AppError::MissingInput | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Wire code of the response this error produces
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(rejection) => rejection.code(),
            AppError::MissingInput => "missing_input",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::BadRequest(_) => "bad_request",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Configuration(_) => "server_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match self {
            AppError::Auth(rejection) => return rejection.into_response(),
            AppError::MissingInput => "Email and password are required".to_string(),
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::BadRequest(msg) | AppError::Forbidden(msg) => msg,
            AppError::NotFound(what) => format!("{what} not found"),
            AppError::Configuration(detail) => {
                tracing::error!(detail = %detail, "Server configuration error");
                "Server configuration error.".to_string()
            }
            AppError::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal server error");
                "Server error, please try again later".to_string()
            }
        };
        let error = ApiError::new(code, message);

        (status, Json(error)).into_response()
    }
}

impl From<AuthRejection> for AppError {
    fn from(rejection: AuthRejection) -> Self {
        AppError::Auth(rejection)
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::MissingInput => AppError::MissingInput,
            CredentialError::InvalidCredentials => AppError::InvalidCredentials,
            CredentialError::Configuration(msg) => AppError::Configuration(msg.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Configuration(msg) => AppError::Configuration(msg.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::EmailAlreadyExists => {
                AppError::BadRequest("User already exists".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(what) => AppError::NotFound(what.to_string()),
            ContentError::Validation(msg) => AppError::BadRequest(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}
