//! Authentication and authorization
//!
//! - `jwt`: token codec (issue/verify signed, time-bounded assertions)
//! - `credentials`: admin and user credential checks
//! - `middleware`: bearer authentication and the role guard
//! - `service`: login, registration and profile lookup
//! - `password`, `repository`, `models`: hashing, user storage, wire types

pub mod credentials;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;

pub use credentials::{CredentialError, CredentialVerifier, VerifiedLogin};
pub use jwt::{JwtConfig, TokenCodec, TokenError, VerifiedClaims};
pub use middleware::{authenticate, authorize, require_roles, AuthRejection, Identity};
pub use models::{AuthResponse, LoginRequest, ProfileResponse, RegisterRequest, UserRecord};
pub use repository::{MemoryUserStore, PgUserStore, RepositoryError, UserStore};
pub use service::AuthService;
