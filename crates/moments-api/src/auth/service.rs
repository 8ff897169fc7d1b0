//! Authentication service layer
//!
//! Login, registration and profile lookup on top of the credential verifier
//! and the token codec. Every issued token lives for `ACCESS_TOKEN_TTL_SECS`.

use super::credentials::{CredentialVerifier, VerifiedLogin};
use super::jwt::TokenCodec;
use super::middleware::{AuthRejection, Identity};
use super::models::{AuthResponse, LoginRequest, RegisterRequest, UserRecord};
use super::password::{hash_password, validate_password_strength, PasswordConfig};
use super::repository::UserStore;
use crate::error::AppError;
use moments_core::{AppConfig, Role, UserProfile, ACCESS_TOKEN_TTL_SECS};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a successful login or registration
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user: UserProfile,
}

impl IssuedSession {
    pub fn into_auth_response(self, message: &str) -> AuthResponse {
        AuthResponse {
            success: true,
            message: message.to_string(),
            token: self.token,
            user: self.user,
        }
    }
}

/// Authentication service
pub struct AuthService {
    codec: Arc<TokenCodec>,
    verifier: CredentialVerifier,
    users: Arc<dyn UserStore>,
    password_config: PasswordConfig,
}

impl AuthService {
    pub fn new(config: &AppConfig, codec: Arc<TokenCodec>, users: Arc<dyn UserStore>) -> Self {
        Self {
            codec,
            verifier: CredentialVerifier::new(&config.auth, users.clone()),
            users,
            password_config: PasswordConfig::from_auth_config(&config.auth),
        }
    }

    fn ttl() -> Duration {
        Duration::from_secs(ACCESS_TOKEN_TTL_SECS)
    }

    fn issue(&self, login: VerifiedLogin) -> Result<IssuedSession, AppError> {
        let token = self.codec.issue(&login.subject, login.role, Self::ttl())?;
        Ok(IssuedSession {
            token,
            user: login.profile,
        })
    }

    /// Log in as the configured administrator
    pub fn admin_login(&self, request: &LoginRequest) -> Result<IssuedSession, AppError> {
        let login = self
            .verifier
            .verify_admin(request.email.as_deref(), request.password.as_deref())?;
        self.issue(login)
    }

    /// Log in with a stored account
    pub async fn login(&self, request: &LoginRequest) -> Result<IssuedSession, AppError> {
        let login = self
            .verifier
            .verify_user(request.email.as_deref(), request.password.as_deref())
            .await?;
        self.issue(login)
    }

    /// Create an author or reader account and log it in
    pub async fn register(&self, request: RegisterRequest) -> Result<IssuedSession, AppError> {
        let name = trimmed(request.name.as_deref());
        let email = trimmed(request.email.as_deref());
        let password = request.password.unwrap_or_default();

        let (Some(name), Some(email)) = (name, email) else {
            return Err(AppError::BadRequest(
                "Name, email and password are required".to_string(),
            ));
        };
        if password.is_empty() {
            return Err(AppError::BadRequest(
                "Name, email and password are required".to_string(),
            ));
        }

        if !looks_like_email(&email) {
            return Err(AppError::BadRequest("Invalid email address".to_string()));
        }

        let role = request.role.unwrap_or(Role::Reader);
        if !role.is_self_assignable() {
            return Err(AppError::BadRequest(
                "Role must be either reader or author".to_string(),
            ));
        }

        validate_password_strength(&password).map_err(AppError::BadRequest)?;

        if self.verifier.is_admin_email(&email) {
            return Err(AppError::BadRequest("User already exists".to_string()));
        }

        let config = self.password_config.clone();
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password(&password, &config)).await??;

        let record = self
            .users
            .insert(UserRecord::new(name, email, password_hash, role))
            .await?;

        self.issue(VerifiedLogin {
            subject: record.email.clone(),
            role: record.role,
            profile: record.to_profile(),
        })
    }

    /// Profile of the authenticated caller
    ///
    /// A token whose account has since been removed is rejected as
    /// `invalid_token`.
    pub async fn profile(&self, identity: &Identity) -> Result<UserProfile, AppError> {
        if identity.is_admin() {
            if self.verifier.is_admin_email(identity.subject()) {
                return Ok(UserProfile::admin(identity.subject()));
            }
            return Err(AuthRejection::InvalidToken.into());
        }

        match self.users.find_by_email(identity.subject()).await? {
            Some(record) if record.role == identity.role() => Ok(record.to_profile()),
            _ => Err(AuthRejection::InvalidToken.into()),
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
