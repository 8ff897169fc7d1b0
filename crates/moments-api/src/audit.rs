//! Security audit trail
//!
//! Logins, registrations and every request the auth layer turns away are
//! written at INFO level under the `audit` target, so they can be routed
//! apart from application logs. Passwords and tokens never appear in an
//! event.

use axum::http::{header, HeaderMap};
use chrono::Utc;
use moments_core::Role;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where a request came from, as far as the proxy headers tell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestOrigin {
    /// First `X-Forwarded-For` hop, else `X-Real-IP`; plus `User-Agent`
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let forwarded = header_str("x-forwarded-for")
            .and_then(|xff| xff.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        Self {
            ip_address: forwarded.or_else(|| header_str("x-real-ip")).map(String::from),
            user_agent: header_str(header::USER_AGENT.as_str()).map(String::from),
        }
    }
}

/// One entry of the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    LoginSuccess {
        email: String,
        role: Role,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    /// `reason` is the wire code sent back to the caller
    LoginFailure {
        email: String,
        reason: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    RegistrationSuccess {
        email: String,
        role: Role,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    RegistrationFailure {
        email: String,
        reason: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    /// Authenticated, but the role guard said no
    AccessDenied {
        email: Option<String>,
        role: Option<Role>,
        resource: String,
        required_roles: Vec<Role>,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    /// No `Authorization` header, or one that is not `Bearer <token>`
    MissingCredentials {
        code: String,
        reason: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    /// Bearer token forged, garbled or expired
    InvalidToken {
        code: String,
        reason: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::MissingCredentials { .. } => "Missing credentials",
            AuditEvent::InvalidToken { .. } => "Invalid token",
        }
    }

    pub fn origin(&self) -> &RequestOrigin {
        match self {
            AuditEvent::LoginSuccess { origin, .. }
            | AuditEvent::LoginFailure { origin, .. }
            | AuditEvent::RegistrationSuccess { origin, .. }
            | AuditEvent::RegistrationFailure { origin, .. }
            | AuditEvent::AccessDenied { origin, .. }
            | AuditEvent::MissingCredentials { origin, .. }
            | AuditEvent::InvalidToken { origin, .. } => origin,
        }
    }

    /// Who the event is about, when known
    fn subject(&self) -> Option<&str> {
        match self {
            AuditEvent::LoginSuccess { email, .. }
            | AuditEvent::LoginFailure { email, .. }
            | AuditEvent::RegistrationSuccess { email, .. }
            | AuditEvent::RegistrationFailure { email, .. } => Some(email.as_str()),
            AuditEvent::AccessDenied { email, .. } => email.as_deref(),
            AuditEvent::MissingCredentials { .. } | AuditEvent::InvalidToken { .. } => None,
        }
    }

    /// Failure code or reason, if the event is a refusal
    pub fn outcome(&self) -> Option<&str> {
        match self {
            AuditEvent::LoginFailure { reason, .. }
            | AuditEvent::RegistrationFailure { reason, .. } => Some(reason.as_str()),
            AuditEvent::MissingCredentials { code, .. } | AuditEvent::InvalidToken { code, .. } => {
                Some(code.as_str())
            }
            AuditEvent::AccessDenied { .. } => Some("forbidden"),
            AuditEvent::LoginSuccess { .. } | AuditEvent::RegistrationSuccess { .. } => None,
        }
    }
}

/// Write `event` to the audit target
///
/// The full event goes out as JSON in the `event` field; subject, outcome
/// and client IP are repeated as plain fields for filtering.
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        timestamp = %Utc::now(),
        event = %event_json,
        subject = ?event.subject(),
        outcome = ?event.outcome(),
        ip_address = ?event.origin().ip_address,
        "{}", event.summary()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_event_json_is_flat() {
        let event = AuditEvent::LoginSuccess {
            email: "ann@site.com".to_string(),
            role: Role::Author,
            origin: RequestOrigin {
                ip_address: Some("192.168.1.1".to_string()),
                user_agent: None,
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "login_success");
        assert_eq!(json["role"], "author");
        assert_eq!(json["ip_address"], "192.168.1.1");
    }

    #[test]
    fn test_access_denied_outcome() {
        let event = AuditEvent::AccessDenied {
            email: Some("reader@site.com".to_string()),
            role: Some(Role::Reader),
            resource: "POST /api/blog/add".to_string(),
            required_roles: vec![Role::Admin, Role::Author],
            origin: RequestOrigin::default(),
        };

        assert_eq!(event.subject(), Some("reader@site.com"));
        assert_eq!(event.outcome(), Some("forbidden"));
        audit_log(&event);
    }

    #[test]
    fn test_invalid_token_has_no_subject() {
        let event = AuditEvent::InvalidToken {
            code: "token_expired".to_string(),
            reason: "Token has expired".to_string(),
            origin: RequestOrigin::default(),
        };

        assert_eq!(event.subject(), None);
        assert_eq!(event.outcome(), Some("token_expired"));
        audit_log(&event);
    }

    #[test]
    fn test_missing_credentials_event() {
        let event = AuditEvent::MissingCredentials {
            code: "no_token".to_string(),
            reason: "No token provided".to_string(),
            origin: RequestOrigin::default(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "missing_credentials");
        assert_eq!(event.outcome(), Some("no_token"));
        assert_eq!(event.subject(), None);
    }

    #[test]
    fn test_origin_prefers_first_forwarded_hop() {
        let origin = RequestOrigin::from_headers(&headers(&[
            ("x-forwarded-for", "203.0.113.1, 198.51.100.1"),
            ("x-real-ip", "10.0.0.1"),
            ("user-agent", "curl/8.0"),
        ]));

        assert_eq!(origin.ip_address.as_deref(), Some("203.0.113.1"));
        assert_eq!(origin.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_origin_falls_back_to_real_ip() {
        let origin = RequestOrigin::from_headers(&headers(&[
            ("x-forwarded-for", " "),
            ("x-real-ip", "10.0.0.1"),
        ]));
        assert_eq!(origin.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_origin_without_headers() {
        assert_eq!(
            RequestOrigin::from_headers(&HeaderMap::new()),
            RequestOrigin::default()
        );
    }
}
