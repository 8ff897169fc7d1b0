//! Authentication API handlers
//!
//! Admin login, user login, registration and the current-profile endpoint.
//! Every outcome is written to the audit log.

use crate::audit::{audit_log, AuditEvent, RequestOrigin};
use crate::auth::{AuthResponse, Identity, LoginRequest, ProfileResponse, RegisterRequest};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

fn login_failure(headers: &HeaderMap, email: Option<&str>, err: &AppError) {
    audit_log(&AuditEvent::LoginFailure {
        email: email.unwrap_or_default().to_string(),
        reason: err.code().to_string(),
        origin: RequestOrigin::from_headers(headers),
    });
}

fn login_success(headers: &HeaderMap, response: &AuthResponse) {
    audit_log(&AuditEvent::LoginSuccess {
        email: response.user.email.clone(),
        role: response.user.role,
        origin: RequestOrigin::from_headers(headers),
    });
}

/// Log in as the configured administrator
///
/// Email and password must both match exactly. The error never says which
/// one was wrong.
#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing email or password", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Server configuration error", body = crate::error::ApiError),
    )
)]
pub async fn admin_login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(request) = payload?;

    match state.auth.admin_login(&request) {
        Ok(session) => {
            let response = session.into_auth_response("Login successful");
            login_success(&headers, &response);
            Ok(Json(response))
        }
        Err(err) => {
            login_failure(&headers, request.email.as_deref(), &err);
            Err(err)
        }
    }
}

/// Log in with a registered author or reader account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing email or password", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(request) = payload?;

    match state.auth.login(&request).await {
        Ok(session) => {
            let response = session.into_auth_response("Login successful");
            login_success(&headers, &response);
            Ok(Json(response))
        }
        Err(err) => {
            login_failure(&headers, request.email.as_deref(), &err);
            Err(err)
        }
    }
}

/// Register a new account
///
/// `role` may be `reader` (default) or `author`. The password needs 8+
/// characters with an uppercase letter, a lowercase letter and a digit.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid input or email already exists", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(request) = payload?;
    let email = request.email.clone().unwrap_or_default();

    match state.auth.register(request).await {
        Ok(session) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                email: session.user.email.clone(),
                role: session.user.role,
                origin: RequestOrigin::from_headers(&headers),
            });
            Ok(Json(session.into_auth_response("Registration successful")))
        }
        Err(err) => {
            audit_log(&AuditEvent::RegistrationFailure {
                email,
                reason: err.code().to_string(),
                origin: RequestOrigin::from_headers(&headers),
            });
            Err(err)
        }
    }
}

/// Current account profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Token is valid", body = ProfileResponse),
        (status = 401, description = "Missing, invalid or expired token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state.auth.profile(&identity).await?;
    Ok(Json(ProfileResponse {
        success: true,
        user,
    }))
}
