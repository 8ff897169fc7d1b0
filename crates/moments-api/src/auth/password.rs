//! Password hashing and verification using Argon2id
//!
//! Stored credential secrets are PHC strings (algorithm, parameters, salt and
//! hash in one field), so verification needs no extra columns and picks up
//! whatever cost parameters the hash was created with.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use moments_core::AuthConfig;
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2 cost parameters
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (lanes, default: 4)
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl PasswordConfig {
    pub fn from_auth_config(auth: &AuthConfig) -> Self {
        Self {
            memory_cost: auth.argon2_memory_kib,
            time_cost: auth.argon2_iterations,
            parallelism: auth.argon2_parallelism,
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(self.memory_cost, self.time_cost, self.parallelism, Some(32))
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Hash a password with the given cost parameters
///
/// Returns a PHC string, e.g. `$argon2id$v=19$m=65536,t=3,p=4$...`.
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, config.to_params()?);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash
///
/// `Ok(false)` means the password is wrong; `Err` means the stored hash is
/// unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Check registration password rules
///
/// At least 8 characters with an uppercase letter, a lowercase letter and a
/// digit. The error names every rule the password breaks.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let rules: [(&str, bool); 4] = [
        ("at least 8 characters", password.chars().count() >= 8),
        ("an uppercase letter", password.chars().any(char::is_uppercase)),
        ("a lowercase letter", password.chars().any(char::is_lowercase)),
        ("a digit", password.chars().any(|c| c.is_ascii_digit())),
    ];

    let missing: Vec<&str> = rules
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(rule, _)| *rule)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Password needs {}", missing.join(", ")))
    }
}
