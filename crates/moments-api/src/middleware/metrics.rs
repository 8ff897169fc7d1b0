//! Metrics tracking middleware
//!
//! Counts every request, the status each endpoint returned, and auth
//! rejections by their wire code.

use crate::auth::middleware::RejectionCode;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.increment_requests();
    let endpoint = normalize_endpoint(request.uri().path());

    let response = next.run(request).await;

    state
        .record_request(endpoint, response.status().as_u16())
        .await;
    if let Some(RejectionCode(code)) = response.extensions().get::<RejectionCode>().copied() {
        state.record_rejection(code).await;
    }

    response
}

/// Normalize endpoint paths for consistent metrics
///
/// Replaces UUID and numeric segments with `:id`.
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|seg| if is_uuid(seg) || is_numeric(seg) { ":id" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36
        && s.chars().enumerate().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("/api/blog/550e8400-e29b-41d4-a716-446655440000"),
            "/api/blog/:id"
        );
        assert_eq!(normalize_endpoint("/api/moments/42"), "/api/moments/:id");
        assert_eq!(normalize_endpoint("/api/blog/all"), "/api/blog/all");
        assert_eq!(normalize_endpoint("/"), "/");
    }

    #[test]
    fn test_is_uuid() {
        assert!(is_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_uuid("not-a-uuid"));
    }
}
