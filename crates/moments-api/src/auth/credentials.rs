//! Login credential checks
//!
//! Two flavors of account exist: the single administrator configured through
//! `ADMIN_EMAIL`/`ADMIN_PASSWORD`, and per-user records in a [`UserStore`].
//! Both paths report the same `InvalidCredentials` for every mismatch so a
//! caller cannot learn which field was wrong or whether an account exists.

use super::models::UserRecord;
use super::password::{hash_password, verify_password, PasswordConfig, PasswordError};
use super::repository::{RepositoryError, UserStore};
use moments_core::{AuthConfig, Role, UserProfile};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Credential verification errors
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Email and password are required")]
    MissingInput,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Credential verification is not configured: {0}")]
    Configuration(&'static str),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Verification task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Outcome of a successful credential check
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    /// Token subject (the account email)
    pub subject: String,
    pub role: Role,
    pub profile: UserProfile,
}

struct AdminCredential {
    email: String,
    email_digest: [u8; 32],
    password_digest: [u8; 32],
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Compare two digests without stopping at the first differing byte
fn digests_equal(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// The value as sent, or `MissingInput` when absent or blank
fn required(value: Option<&str>) -> Result<&str, CredentialError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CredentialError::MissingInput),
    }
}

const DECOY_PASSWORD: &str = "moments-decoy-password";

/// Checks presented email/password pairs against admin and user credentials
pub struct CredentialVerifier {
    admin: Option<AdminCredential>,
    users: Arc<dyn UserStore>,
    password_config: PasswordConfig,
    /// Hash checked when the email is unknown, so that path costs the same
    /// argon2 work as a real mismatch
    decoy_hash: OnceCell<Option<String>>,
}

impl CredentialVerifier {
    pub fn new(auth: &AuthConfig, users: Arc<dyn UserStore>) -> Self {
        let admin = match (auth.admin_email.as_deref(), auth.admin_password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminCredential {
                    email: email.to_string(),
                    email_digest: digest(email),
                    password_digest: digest(password),
                })
            }
            _ => None,
        };

        Self {
            admin,
            users,
            password_config: PasswordConfig::from_auth_config(auth),
            decoy_hash: OnceCell::new(),
        }
    }

    /// Whether an administrator credential is configured
    pub fn has_admin(&self) -> bool {
        self.admin.is_some()
    }

    /// Whether `email` is the configured administrator address
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin.as_ref().is_some_and(|admin| admin.email == email)
    }

    /// Check against the configured administrator (exact, case-sensitive)
    pub fn verify_admin(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<VerifiedLogin, CredentialError> {
        let email = required(email)?;
        let password = required(password)?;

        let admin = self
            .admin
            .as_ref()
            .ok_or(CredentialError::Configuration("ADMIN_EMAIL/ADMIN_PASSWORD are not set"))?;

        // Both comparisons always run.
        let email_ok = digests_equal(&digest(email), &admin.email_digest);
        let password_ok = digests_equal(&digest(password), &admin.password_digest);

        if email_ok & password_ok {
            Ok(VerifiedLogin {
                subject: admin.email.clone(),
                role: Role::Admin,
                profile: UserProfile::admin(admin.email.clone()),
            })
        } else {
            Err(CredentialError::InvalidCredentials)
        }
    }

    /// Check against the user store with a one-way password comparison
    pub async fn verify_user(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<VerifiedLogin, CredentialError> {
        // Registration stores emails trimmed; passwords are hashed as sent.
        let email = required(email)?.trim();
        let password = required(password)?.to_string();

        let record = self.users.find_by_email(email).await?;
        let hash = match &record {
            Some(record) => record.password_hash.clone(),
            None => self
                .decoy_hash()
                .await
                .ok_or(CredentialError::InvalidCredentials)?,
        };

        let matches =
            tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await??;

        match record {
            Some(record) if matches => Ok(login_for(&record)),
            _ => Err(CredentialError::InvalidCredentials),
        }
    }

    async fn decoy_hash(&self) -> Option<String> {
        self.decoy_hash
            .get_or_init(|| async {
                let config = self.password_config.clone();
                match tokio::task::spawn_blocking(move || hash_password(DECOY_PASSWORD, &config))
                    .await
                {
                    Ok(Ok(hash)) => Some(hash),
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Could not prepare decoy password hash");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Decoy hash task failed");
                        None
                    }
                }
            })
            .await
            .clone()
    }
}

fn login_for(record: &UserRecord) -> VerifiedLogin {
    VerifiedLogin {
        subject: record.email.clone(),
        role: record.role,
        profile: record.to_profile(),
    }
}
