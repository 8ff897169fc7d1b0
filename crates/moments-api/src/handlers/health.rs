//! Health check handlers

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use utoipa::ToSchema;

/// Root banner
pub async fn root() -> &'static str {
    "API is working fine"
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub name: String,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    /// Token signing secret present
    pub token_signing: bool,
    /// Administrator credential configured
    pub admin_credential: bool,
    /// User store reachable
    pub user_store: bool,
}

/// Readiness probe - checks configuration and dependencies
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let checks = ReadinessChecks {
        token_signing: state.codec.is_configured(),
        admin_credential: state.config.auth.admin_email.is_some()
            && state.config.auth.admin_password.is_some(),
        user_store: state.users.is_healthy().await,
    };

    // A missing admin credential only disables admin login.
    let ready = state.is_ready() && checks.token_signing && checks.user_store;
    let response = ReadinessResponse { ready, checks };

    if ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Prometheus-compatible metrics endpoint
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut output = String::new();

    output.push_str("# HELP moments_uptime_seconds Time since server start\n");
    output.push_str("# TYPE moments_uptime_seconds gauge\n");
    let _ = writeln!(output, "moments_uptime_seconds {}\n", state.uptime_secs());

    output.push_str("# HELP moments_requests_total Total number of HTTP requests\n");
    output.push_str("# TYPE moments_requests_total counter\n");
    let _ = writeln!(output, "moments_requests_total {}\n", state.get_request_count());

    output.push_str("# HELP moments_build_info Build information\n");
    output.push_str("# TYPE moments_build_info gauge\n");
    let _ = writeln!(
        output,
        "moments_build_info{{version=\"{}\"}} 1\n",
        env!("CARGO_PKG_VERSION")
    );

    output.push_str("# HELP moments_http_requests_total HTTP requests by endpoint and status\n");
    output.push_str("# TYPE moments_http_requests_total counter\n");
    for ((endpoint, status), count) in state.endpoint_counts().await {
        let _ = writeln!(
            output,
            "moments_http_requests_total{{endpoint=\"{endpoint}\",status=\"{status}\"}} {count}"
        );
    }
    output.push('\n');

    output.push_str("# HELP moments_auth_rejections_total Requests rejected by the auth layer\n");
    output.push_str("# TYPE moments_auth_rejections_total counter\n");
    for (code, count) in state.rejection_counts().await {
        let _ = writeln!(
            output,
            "moments_auth_rejections_total{{code=\"{code}\"}} {count}"
        );
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        output,
    )
}
