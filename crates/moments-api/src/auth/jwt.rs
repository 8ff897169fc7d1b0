//! JWT token generation and validation
//!
//! Implements the identity assertion codec with HMAC-SHA256 signing.
//! Tokens are self-contained: validity is derived only from the signature
//! and the expiry embedded in the token. There is no server-side session
//! record, so rotating the secret is the only way to invalidate tokens early.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use moments_core::{AuthConfig, Role, TokenClaims};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token signing is not configured: {0}")]
    Configuration(&'static str),

    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token claims: {0}")]
    InvalidClaims(&'static str),

    #[error("Failed to encode JWT: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("System time error: {0}")]
    Clock(#[from] std::time::SystemTimeError),
}

/// JWT Configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing; `None` leaves the codec unusable
    pub secret: Option<String>,
    /// Token issuer identifier
    pub issuer: String,
}

impl JwtConfig {
    pub fn from_auth_config(auth: &AuthConfig) -> Self {
        Self {
            secret: auth.jwt_secret.clone(),
            issuer: auth.jwt_issuer.clone(),
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Claims of a token whose signature, issuer and expiry have been checked
///
/// Fields are private: the only way to obtain one is [`TokenCodec::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    subject: String,
    role: Role,
    issued_at: u64,
    expires_at: u64,
    token_id: String,
}

impl VerifiedClaims {
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

    pub fn token_id(&self) -> &str {
        &self.token_id
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies signed, time-bounded identity assertions
pub struct TokenCodec {
    keys: Option<SigningKeys>,
    issuer: String,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("configured", &self.keys.is_some())
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(config: JwtConfig) -> Self {
        let keys = config
            .secret
            .filter(|s| !s.is_empty())
            .map(|secret| SigningKeys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            });

        Self {
            keys,
            issuer: config.issuer,
        }
    }

    /// Whether a signing secret is present
    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    fn keys(&self) -> Result<&SigningKeys, TokenError> {
        self.keys
            .as_ref()
            .ok_or(TokenError::Configuration("JWT_SECRET is not set"))
    }

    /// Issue a token for `subject` valid for `ttl` from now
    pub fn issue(&self, subject: &str, role: Role, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(subject, role, ttl, unix_now()?)
    }

    /// Issue a token as if the clock read `now` (Unix seconds)
    pub fn issue_at(
        &self,
        subject: &str,
        role: Role,
        ttl: Duration,
        now: u64,
    ) -> Result<String, TokenError> {
        let keys = self.keys()?;

        if subject.trim().is_empty() {
            return Err(TokenError::InvalidClaims("subject must not be empty"));
        }
        if ttl.as_secs() == 0 {
            return Err(TokenError::InvalidClaims("expiry must follow issue time"));
        }

        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            role,
            iat: now,
            exp: now + ttl.as_secs(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)?;
        Ok(token)
    }

    /// Verify a token against the current secret and clock
    pub fn verify(&self, token: &str) -> Result<VerifiedClaims, TokenError> {
        self.verify_at(token, unix_now()?)
    }

    /// Verify a token as if the clock read `now` (Unix seconds)
    ///
    /// The signature is checked before expiry, so a forged token never
    /// reports `TokenExpired`.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<VerifiedClaims, TokenError> {
        let keys = self.keys()?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the supplied clock, with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let claims = decode::<TokenClaims>(token, &keys.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::TokenExpired,
                ErrorKind::InvalidIssuer => TokenError::InvalidClaims("unexpected issuer"),
                _ => TokenError::MalformedToken,
            })?
            .claims;

        if claims.exp <= claims.iat {
            return Err(TokenError::InvalidClaims("expiry must follow issue time"));
        }
        if claims.sub.is_empty() {
            return Err(TokenError::InvalidClaims("subject must not be empty"));
        }
        if now >= claims.exp {
            return Err(TokenError::TokenExpired);
        }

        Ok(VerifiedClaims {
            subject: claims.sub,
            role: claims.role,
            issued_at: claims.iat,
            expires_at: claims.exp,
            token_id: claims.jti,
        })
    }
}

/// Current time in Unix seconds
pub fn unix_now() -> Result<u64, TokenError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
