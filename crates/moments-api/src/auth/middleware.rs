//! Authentication middleware and role guard
//!
//! `authenticate` turns an `Authorization: Bearer <token>` header into an
//! [`Identity`] in the request extensions, or ends the request with a 401.
//! `require_roles` runs after it and ends the request with 401 `no_user` or
//! 403 `forbidden`. Neither ever falls through to the handler on failure.
//!
//! ```ignore
//! let blog_writes = Router::new()
//!     .route("/add", post(add_blog))
//!     .route_layer(middleware::from_fn(require_roles(&[Role::Admin, Role::Author])))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));
//! ```

use super::jwt::{TokenError, VerifiedClaims};
use crate::audit::{audit_log, AuditEvent, RequestOrigin};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use moments_core::Role;
use serde::Serialize;
use std::sync::Arc;

/// Request identity context
///
/// Built only from [`VerifiedClaims`], so holding one means the token behind
/// it passed signature, issuer and expiry checks. Lives for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    subject: String,
    role: Role,
    issued_at: u64,
    expires_at: u64,
}

impl Identity {
    /// Account email
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn issued_at(&self) -> u64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<VerifiedClaims> for Identity {
    fn from(claims: VerifiedClaims) -> Self {
        Self {
            subject: claims.subject().to_string(),
            role: claims.role(),
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AuthRejection::NoUser)
    }
}

/// Machine-readable code of an auth rejection, attached to the response
/// extensions so the metrics layer can count it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectionCode(pub &'static str);

/// Reasons the auth layer ends a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No Authorization header
    NoToken,
    /// Header present but not `Bearer <token>`
    InvalidFormat,
    /// Signature valid, expiry passed
    TokenExpired,
    /// Malformed, forged or otherwise unacceptable token
    InvalidToken,
    /// Role guard reached without an identity
    NoUser,
    /// Identity established, role not permitted
    Forbidden,
    /// Token signing not configured
    ServerError,
}

impl AuthRejection {
    pub fn code(&self) -> &'static str {
        match self {
            AuthRejection::NoToken => "no_token",
            AuthRejection::InvalidFormat => "invalid_format",
            AuthRejection::TokenExpired => "token_expired",
            AuthRejection::InvalidToken => "invalid_token",
            AuthRejection::NoUser => "no_user",
            AuthRejection::Forbidden => "forbidden",
            AuthRejection::ServerError => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthRejection::Forbidden => StatusCode::FORBIDDEN,
            AuthRejection::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthRejection::NoToken => "No authorization token provided. Please login first.",
            AuthRejection::InvalidFormat => "Invalid authorization format.",
            AuthRejection::TokenExpired => "Session expired. Please login again.",
            AuthRejection::InvalidToken => "Invalid or malformed token. Please login again.",
            AuthRejection::NoUser => "Authentication required.",
            AuthRejection::Forbidden => "Access denied. Your role does not permit this action.",
            AuthRejection::ServerError => "Server configuration error.",
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            AuthRejection::NoToken => Some("Add Authorization header: 'Bearer {token}'"),
            AuthRejection::InvalidFormat => Some("Use: Authorization: Bearer {token}"),
            _ => None,
        }
    }

    /// Map a verification failure onto the wire codes
    pub fn from_token_error(err: &TokenError) -> Self {
        match err {
            TokenError::TokenExpired => AuthRejection::TokenExpired,
            TokenError::Configuration(_) => AuthRejection::ServerError,
            _ => AuthRejection::InvalidToken,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let mut body = ApiError::new(self.code(), self.message());
        if let Some(hint) = self.hint() {
            body = body.with_hint(hint);
        }

        let mut response = (self.status(), Json(body)).into_response();
        response.extensions_mut().insert(RejectionCode(self.code()));
        response
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header
///
/// The scheme is case-sensitive and the token must be a single non-empty
/// word.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthRejection::NoToken)?
        .to_str()
        .map_err(|_| AuthRejection::InvalidFormat)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthRejection::InvalidFormat)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthRejection::InvalidFormat);
    }

    Ok(token)
}

/// Authentication middleware requiring a valid bearer token
///
/// On success the request carries an [`Identity`] extension. The token itself
/// is never modified or forwarded.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token,
        Err(rejection) => {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                code = rejection.code(),
                "Rejected request without usable Authorization header"
            );
            audit_log(&rejection_event(request.headers(), rejection, rejection.message()));
            return Err(rejection);
        }
    };

    let claims = match state.codec.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            let rejection = AuthRejection::from_token_error(&err);
            if rejection == AuthRejection::ServerError {
                tracing::error!(error = %err, "Token verification is not configured");
            } else {
                tracing::debug!(
                    method = %request.method(),
                    path = %request.uri().path(),
                    error = %err,
                    "Token verification failed"
                );
            }
            audit_log(&rejection_event(request.headers(), rejection, &err.to_string()));
            return Err(rejection);
        }
    };

    let identity = Identity::from(claims);
    tracing::debug!(
        subject = %identity.subject(),
        role = %identity.role(),
        "Token verified"
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Header problems and token problems are audited as different events
fn rejection_event(headers: &HeaderMap, rejection: AuthRejection, reason: &str) -> AuditEvent {
    let code = rejection.code().to_string();
    let reason = reason.to_string();
    let origin = RequestOrigin::from_headers(headers);

    match rejection {
        AuthRejection::NoToken | AuthRejection::InvalidFormat => AuditEvent::MissingCredentials {
            code,
            reason,
            origin,
        },
        _ => AuditEvent::InvalidToken {
            code,
            reason,
            origin,
        },
    }
}

/// Role check
///
/// Absent identity means the guard was wired without `authenticate` in
/// front of it. There is no implicit admin bypass: `allowed` must list
/// every permitted role.
pub fn authorize<'a>(
    identity: Option<&'a Identity>,
    allowed: &[Role],
) -> Result<&'a Identity, AuthRejection> {
    let identity = identity.ok_or(AuthRejection::NoUser)?;

    if allowed.contains(&identity.role) {
        Ok(identity)
    } else {
        Err(AuthRejection::Forbidden)
    }
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthRejection>> + Send>>;

/// Middleware factory for role-based access control
///
/// Must be layered inside (i.e. added before) `authenticate`.
pub fn require_roles(
    allowed: &'static [Role],
) -> impl Fn(Request, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let decision = authorize(request.extensions().get::<Identity>(), allowed).map(|_| ());
            match decision {
                Ok(()) => Ok(next.run(request).await),
                Err(AuthRejection::NoUser) => {
                    tracing::error!(
                        path = %request.uri().path(),
                        "Role guard reached without an authenticated identity"
                    );
                    Err(AuthRejection::NoUser)
                }
                Err(rejection) => {
                    let identity = request.extensions().get::<Identity>();
                    audit_log(&AuditEvent::AccessDenied {
                        email: identity.map(|i| i.subject().to_string()),
                        role: identity.map(Identity::role),
                        resource: format!("{} {}", request.method(), request.uri().path()),
                        required_roles: allowed.to_vec(),
                        origin: RequestOrigin::from_headers(request.headers()),
                    });
                    Err(rejection)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn identity(role: Role) -> Identity {
        Identity {
            subject: "someone@site.com".to_string(),
            role,
            issued_at: 1_700_000_000,
            expires_at: 1_700_007_200,
        }
    }

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthRejection::NoToken));
        assert_eq!(
            bearer_token(&headers("Token abc")),
            Err(AuthRejection::InvalidFormat)
        );
        assert_eq!(
            bearer_token(&headers("bearer abc")),
            Err(AuthRejection::InvalidFormat)
        );
        assert_eq!(bearer_token(&headers("Bearer ")), Err(AuthRejection::InvalidFormat));
        assert_eq!(bearer_token(&headers("Bearer")), Err(AuthRejection::InvalidFormat));
        assert_eq!(
            bearer_token(&headers("Bearer  abc")),
            Err(AuthRejection::InvalidFormat)
        );
        assert_eq!(
            bearer_token(&headers("Bearer a b")),
            Err(AuthRejection::InvalidFormat)
        );
    }

    #[test]
    fn test_non_utf8_header_is_invalid_format() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );
        assert_eq!(bearer_token(&headers), Err(AuthRejection::InvalidFormat));
    }

    #[test]
    fn test_header_problems_audited_apart_from_bad_tokens() {
        let missing = rejection_event(&HeaderMap::new(), AuthRejection::NoToken, "no header");
        let malformed = rejection_event(
            &headers("Token abc"),
            AuthRejection::InvalidFormat,
            "bad scheme",
        );
        let expired = rejection_event(
            &headers("Bearer a.b.c"),
            AuthRejection::TokenExpired,
            "Token has expired",
        );

        assert!(matches!(missing, AuditEvent::MissingCredentials { .. }));
        assert!(matches!(malformed, AuditEvent::MissingCredentials { .. }));
        assert!(matches!(expired, AuditEvent::InvalidToken { .. }));
        assert_eq!(malformed.outcome(), Some("invalid_format"));
        assert_eq!(expired.outcome(), Some("token_expired"));
    }

    #[test]
    fn test_authorize() {
        const WRITERS: &[Role] = &[Role::Admin, Role::Author];

        assert!(authorize(Some(&identity(Role::Admin)), WRITERS).is_ok());
        assert!(authorize(Some(&identity(Role::Author)), WRITERS).is_ok());
        assert_eq!(
            authorize(Some(&identity(Role::Reader)), WRITERS),
            Err(AuthRejection::Forbidden)
        );
        assert_eq!(authorize(None, WRITERS), Err(AuthRejection::NoUser));
    }

    #[test]
    fn test_admin_has_no_implicit_bypass() {
        assert_eq!(
            authorize(Some(&identity(Role::Admin)), &[Role::Author]),
            Err(AuthRejection::Forbidden)
        );
    }

    #[test]
    fn test_token_error_mapping() {
        assert_eq!(
            AuthRejection::from_token_error(&TokenError::TokenExpired),
            AuthRejection::TokenExpired
        );
        assert_eq!(
            AuthRejection::from_token_error(&TokenError::InvalidSignature),
            AuthRejection::InvalidToken
        );
        assert_eq!(
            AuthRejection::from_token_error(&TokenError::MalformedToken),
            AuthRejection::InvalidToken
        );
        assert_eq!(
            AuthRejection::from_token_error(&TokenError::Configuration("x")),
            AuthRejection::ServerError
        );
    }

    #[test]
    fn test_rejection_statuses() {
        assert_eq!(AuthRejection::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthRejection::NoUser.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthRejection::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthRejection::ServerError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_rejection_response_body() {
        let response = AuthRejection::InvalidFormat.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.extensions().get::<RejectionCode>(),
            Some(&RejectionCode("invalid_format"))
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "invalid_format");
        assert_eq!(json["hint"], "Use: Authorization: Bearer {token}");
    }
}
