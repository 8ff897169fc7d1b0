//! Identity assertion claim layout
//!
//! Tokens are compact JWTs (`header.payload.signature`). The server signs and
//! verifies them; the client only ever peeks at the payload to learn when the
//! token expires. That peek produces [`UnverifiedClaims`], which deliberately
//! exposes nothing but expiry so it cannot stand in for an authenticated
//! identity.

use crate::Role;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of every access token, in seconds (2 hours)
pub const ACCESS_TOKEN_TTL_SECS: u64 = 7200;

/// Claims embedded in an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Token issuer
    pub iss: String,
    /// Subject - account email
    pub sub: String,
    /// Unique token id
    pub jti: String,
    /// Account role
    pub role: Role,
    /// Issued at (Unix seconds)
    pub iat: u64,
    /// Expires at (Unix seconds)
    pub exp: u64,
}

/// Failure to read a token payload without verifying it
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenDecodeError {
    #[error("token must have three dot-separated segments")]
    Segments,

    #[error("token payload is not valid base64url")]
    Base64,

    #[error("token payload is not a valid claim set")]
    Payload,
}

/// Minimal payload view used by the client session
#[derive(Debug, Deserialize)]
struct ExpiryOnly {
    exp: u64,
}

/// Payload read from a token whose signature has NOT been checked
///
/// Only good for local housekeeping (dropping obviously stale tokens). The
/// server verifies every token independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnverifiedClaims {
    expires_at: u64,
}

impl UnverifiedClaims {
    /// Decode the payload segment of a compact token
    pub fn peek(token: &str) -> Result<Self, TokenDecodeError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenDecodeError::Segments);
        };
        if header.is_empty() || payload.is_empty() || signature.is_empty() {
            return Err(TokenDecodeError::Segments);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenDecodeError::Base64)?;
        let claims: ExpiryOnly =
            serde_json::from_slice(&bytes).map_err(|_| TokenDecodeError::Payload)?;

        Ok(Self {
            expires_at: claims.exp,
        })
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// A token is stale once the clock reaches its expiry
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Whether a string has the `header.payload.signature` shape
pub fn has_compact_shape(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.c2lnbmF0dXJl",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_peek_reads_expiry() {
        let token = token_with_payload(
            r#"{"iss":"moments-api","sub":"a@b.c","jti":"x","role":"reader","iat":100,"exp":7300}"#,
        );
        let claims = UnverifiedClaims::peek(&token).unwrap();
        assert_eq!(claims.expires_at(), 7300);
        assert!(!claims.is_expired_at(7299));
        assert!(claims.is_expired_at(7300));
    }

    #[test]
    fn test_peek_rejects_wrong_segment_count() {
        assert_eq!(
            UnverifiedClaims::peek("only.two"),
            Err(TokenDecodeError::Segments)
        );
        assert_eq!(
            UnverifiedClaims::peek("a.b.c.d"),
            Err(TokenDecodeError::Segments)
        );
        assert_eq!(UnverifiedClaims::peek("a..c"), Err(TokenDecodeError::Segments));
    }

    #[test]
    fn test_peek_rejects_garbage_payload() {
        assert_eq!(
            UnverifiedClaims::peek("aaa.!!!.ccc"),
            Err(TokenDecodeError::Base64)
        );

        let token = token_with_payload("not json");
        assert_eq!(UnverifiedClaims::peek(&token), Err(TokenDecodeError::Payload));

        let token = token_with_payload(r#"{"sub":"no-exp"}"#);
        assert_eq!(UnverifiedClaims::peek(&token), Err(TokenDecodeError::Payload));
    }

    #[test]
    fn test_compact_shape() {
        assert!(has_compact_shape("a.b.c"));
        assert!(!has_compact_shape("a.b"));
        assert!(!has_compact_shape("a..c"));
        assert!(!has_compact_shape(""));
    }

    #[test]
    fn test_claims_serialize_role_lowercase() {
        let claims = TokenClaims {
            iss: "moments-api".to_string(),
            sub: "admin@site.com".to_string(),
            jti: "1".to_string(),
            role: Role::Admin,
            iat: 0,
            exp: ACCESS_TOKEN_TTL_SECS,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["exp"], 7200);
    }
}
