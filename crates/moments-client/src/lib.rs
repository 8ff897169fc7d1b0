//! Moments Client - session state and API access
//!
//! - [`Session`]: the token and cached profile, persisted through a
//!   [`SessionStorage`], with local expiry housekeeping and `401`/`403`
//!   reactions
//! - [`ApiClient`]: typed calls against the Moments API that keep the
//!   session in step with the server's answers

pub mod api;
pub mod error;
pub mod session;
pub mod storage;

pub use api::{ApiClient, BlogEntry, DashboardSummary};
pub use error::ClientError;
pub use session::{Notice, Session, SessionError, SessionTicket};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError, PROFILE_KEY, TOKEN_KEY};
