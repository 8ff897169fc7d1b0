//! Client session state
//!
//! One [`Session`] holds the current token and cached profile for the whole
//! client. It is an explicit container: construct it with [`Session::hydrate`]
//! and share it behind an `Arc`.
//!
//! Every mutation that ends or replaces a session bumps a generation counter.
//! Work started under an older generation (a profile fetch, a request that
//! later comes back `401`) is discarded instead of touching the newer state.

use crate::storage::{SessionStorage, StorageError, PROFILE_KEY, TOKEN_KEY};
use moments_core::{has_compact_shape, UnverifiedClaims, UserProfile};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Token is not a compact signed token")]
    MalformedToken,

    #[error("Session changed while the request was in flight")]
    Superseded,

    #[error("Not signed in")]
    NotAuthenticated,
}

/// User-visible notices raised by server responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// `401`: the session was discarded, sign in again
    SessionExpired,
    /// `403`: signed in, but the role does not allow the action
    AccessDenied,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::SessionExpired => f.write_str("Session expired. Please login again."),
            Notice::AccessDenied => f.write_str("Access denied."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Anonymous,
    /// Token stored, profile fetch outstanding
    Pending,
    Authenticated,
}

/// Proof of which session a piece of work belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    generation: u64,
    token: String,
}

impl SessionTicket {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    token: Option<String>,
    profile: Option<UserProfile>,
    generation: u64,
    notices: Vec<Notice>,
}

impl Inner {
    fn anonymous() -> Self {
        Self {
            phase: Phase::Anonymous,
            token: None,
            profile: None,
            generation: 0,
            notices: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.phase = Phase::Anonymous;
        self.token = None;
        self.profile = None;
    }
}

/// Shared session container
pub struct Session {
    storage: Arc<dyn SessionStorage>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Restore the persisted session, dropping a stale token without any
    /// network call
    pub async fn hydrate(storage: Arc<dyn SessionStorage>) -> Result<Self, SessionError> {
        Self::hydrate_at(storage, unix_now()).await
    }

    /// [`Session::hydrate`] with an explicit clock (Unix seconds)
    ///
    /// Storage that cannot be parsed is wiped and the session starts
    /// anonymous.
    pub async fn hydrate_at(
        storage: Arc<dyn SessionStorage>,
        now: u64,
    ) -> Result<Self, SessionError> {
        let inner = match restore(storage.as_ref(), now).await {
            Ok(inner) => inner,
            Err(StorageError::Serialization(e)) => {
                tracing::debug!(error = %e, "Session storage is unreadable, starting anonymous");
                storage.clear().await?;
                Inner::anonymous()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            storage,
            inner: Mutex::new(inner),
        })
    }

    /// Store a freshly issued token and wait for its profile
    ///
    /// Any previous session is replaced.
    pub async fn begin_login(&self, token: &str) -> Result<SessionTicket, SessionError> {
        if !has_compact_shape(token) {
            return Err(SessionError::MalformedToken);
        }

        let mut inner = self.inner.lock().await;
        inner.clear();

        if let Err(e) = self.persist_token(token).await {
            if let Err(cleanup) = self.storage.remove(&[TOKEN_KEY, PROFILE_KEY]).await {
                tracing::debug!(error = %cleanup, "Could not clear storage after a failed login");
            }
            return Err(e.into());
        }

        inner.phase = Phase::Pending;
        inner.token = Some(token.to_string());

        Ok(SessionTicket {
            generation: inner.generation,
            token: token.to_string(),
        })
    }

    async fn persist_token(&self, token: &str) -> Result<(), StorageError> {
        self.storage.remove(&[PROFILE_KEY]).await?;
        self.storage.set(TOKEN_KEY, token).await
    }

    /// Finish a login with the profile fetched for `ticket`
    pub async fn complete_login(
        &self,
        ticket: &SessionTicket,
        profile: UserProfile,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.generation != ticket.generation || inner.phase != Phase::Pending {
            return Err(SessionError::Superseded);
        }

        self.storage
            .set(PROFILE_KEY, &serde_json::to_string(&profile).map_err(StorageError::from)?)
            .await?;
        inner.profile = Some(profile);
        inner.phase = Phase::Authenticated;
        tracing::debug!(generation = inner.generation, "Session authenticated");
        Ok(())
    }

    /// Drop a login that failed, unless something newer replaced it
    pub async fn abort_login(&self, ticket: &SessionTicket) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.generation != ticket.generation {
            return Ok(());
        }
        inner.clear();
        self.storage.remove(&[TOKEN_KEY, PROFILE_KEY]).await?;
        Ok(())
    }

    /// Replace the cached profile of the session `ticket` belongs to
    pub async fn set_profile(
        &self,
        ticket: &SessionTicket,
        profile: UserProfile,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.phase == Phase::Anonymous {
            return Err(SessionError::NotAuthenticated);
        }
        if inner.generation != ticket.generation {
            return Err(SessionError::Superseded);
        }

        self.storage
            .set(PROFILE_KEY, &serde_json::to_string(&profile).map_err(StorageError::from)?)
            .await?;
        inner.profile = Some(profile);
        Ok(())
    }

    /// Forget the session locally; safe to call any number of times
    pub async fn logout(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        inner.clear();
        self.storage.remove(&[TOKEN_KEY, PROFILE_KEY]).await?;
        Ok(())
    }

    /// React to the status of a response sent with `ticket`
    ///
    /// `401` ends the session and raises [`Notice::SessionExpired`]; `403`
    /// only raises [`Notice::AccessDenied`]. A `401` for a session that has
    /// already been replaced is ignored.
    pub async fn observe_status(
        &self,
        ticket: &SessionTicket,
        status: StatusCode,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        match status {
            StatusCode::UNAUTHORIZED => {
                if inner.generation != ticket.generation {
                    return Ok(());
                }
                tracing::info!("Server rejected the session token, signing out");
                inner.clear();
                inner.notices.push(Notice::SessionExpired);
                self.storage.remove(&[TOKEN_KEY, PROFILE_KEY]).await?;
            }
            StatusCode::FORBIDDEN => inner.notices.push(Notice::AccessDenied),
            _ => {}
        }
        Ok(())
    }

    /// Ticket for the current session, if signed in
    pub async fn ticket(&self) -> Option<SessionTicket> {
        let inner = self.inner.lock().await;
        match (&inner.phase, &inner.token) {
            (Phase::Authenticated, Some(token)) => Some(SessionTicket {
                generation: inner.generation,
                token: token.clone(),
            }),
            _ => None,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.lock().await.phase == Phase::Authenticated
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.lock().await.token.clone()
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.inner.lock().await.profile.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.inner.lock().await.generation
    }

    /// Drain queued notices, oldest first
    pub async fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.inner.lock().await.notices)
    }
}

async fn restore(storage: &dyn SessionStorage, now: u64) -> Result<Inner, StorageError> {
    let mut inner = Inner::anonymous();

    if let Some(token) = storage.get(TOKEN_KEY).await? {
        match UnverifiedClaims::peek(&token) {
            Ok(claims) if !claims.is_expired_at(now) => {
                inner.profile = load_profile(storage).await?;
                inner.token = Some(token);
                inner.phase = Phase::Authenticated;
            }
            Ok(_) => {
                tracing::debug!("Persisted token has expired, starting anonymous");
                storage.remove(&[TOKEN_KEY, PROFILE_KEY]).await?;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Persisted token is unreadable, starting anonymous");
                storage.remove(&[TOKEN_KEY, PROFILE_KEY]).await?;
            }
        }
    } else if storage.get(PROFILE_KEY).await?.is_some() {
        storage.remove(&[TOKEN_KEY, PROFILE_KEY]).await?;
    }

    Ok(inner)
}

async fn load_profile(storage: &dyn SessionStorage) -> Result<Option<UserProfile>, StorageError> {
    let Some(raw) = storage.get(PROFILE_KEY).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(profile) => Ok(Some(profile)),
        Err(e) => {
            tracing::debug!(error = %e, "Dropping unreadable cached profile");
            storage.remove(&[PROFILE_KEY]).await?;
            Ok(None)
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use moments_core::Role;

    const NOW: u64 = 1_700_000_000;

    fn token_expiring_at(exp: u64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!(
            r#"{{"iss":"moments-api","sub":"ann@site.com","jti":"x","role":"author","iat":{},"exp":{exp}}}"#,
            exp - 7200
        ));
        format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2lnbmF0dXJl")
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: Some("1".to_string()),
            name: "Ann".to_string(),
            email: "ann@site.com".to_string(),
            role: Role::Author,
            created_at: None,
        }
    }

    async fn signed_in(storage: Arc<MemoryStorage>) -> (Session, SessionTicket) {
        let session = Session::hydrate_at(storage, NOW).await.unwrap();
        let ticket = session
            .begin_login(&token_expiring_at(NOW + 3600))
            .await
            .unwrap();
        session.complete_login(&ticket, profile()).await.unwrap();
        (session, ticket)
    }

    #[tokio::test]
    async fn test_hydrate_empty_storage_is_anonymous() {
        let session = Session::hydrate_at(Arc::new(MemoryStorage::new()), NOW)
            .await
            .unwrap();
        assert!(!session.is_authenticated().await);
        assert!(session.ticket().await.is_none());
    }

    #[tokio::test]
    async fn test_hydrate_keeps_live_token_and_profile() {
        let storage = Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, token_expiring_at(NOW + 60)),
            (PROFILE_KEY, serde_json::to_string(&profile()).unwrap()),
        ]));

        let session = Session::hydrate_at(storage, NOW).await.unwrap();

        assert!(session.is_authenticated().await);
        assert_eq!(session.profile().await, Some(profile()));
    }

    #[tokio::test]
    async fn test_hydrate_discards_expired_token() {
        let storage = Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, token_expiring_at(NOW - 1)),
            (PROFILE_KEY, serde_json::to_string(&profile()).unwrap()),
        ]));

        let session = Session::hydrate_at(storage.clone(), NOW).await.unwrap();

        assert!(!session.is_authenticated().await);
        assert!(storage.is_empty().await);
        assert!(session.take_notices().await.is_empty());
    }

    #[tokio::test]
    async fn test_hydrate_treats_expiry_instant_as_expired() {
        let storage = Arc::new(MemoryStorage::with_entries([(
            TOKEN_KEY,
            token_expiring_at(NOW),
        )]));
        let session = Session::hydrate_at(storage, NOW).await.unwrap();
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_hydrate_discards_garbage_silently() {
        let storage = Arc::new(MemoryStorage::with_entries([(TOKEN_KEY, "garbage")]));

        let session = Session::hydrate_at(storage.clone(), NOW).await.unwrap();

        assert!(!session.is_authenticated().await);
        assert!(storage.is_empty().await);
        assert!(session.take_notices().await.is_empty());
    }

    #[tokio::test]
    async fn test_hydrate_corrupt_session_file_starts_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{\"token\": ").unwrap();
        let storage = Arc::new(FileStorage::new(&path));

        let session = Session::hydrate_at(storage.clone(), NOW).await.unwrap();

        assert!(!session.is_authenticated().await);
        assert!(session.take_notices().await.is_empty());
        assert!(storage.get(TOKEN_KEY).await.unwrap().is_none());

        // The next login writes a fresh file
        session
            .begin_login(&token_expiring_at(NOW + 60))
            .await
            .unwrap();
        assert!(storage.get(TOKEN_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hydrate_drops_orphan_profile() {
        let storage = Arc::new(MemoryStorage::with_entries([(
            PROFILE_KEY,
            serde_json::to_string(&profile()).unwrap(),
        )]));
        Session::hydrate_at(storage.clone(), NOW).await.unwrap();
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_login_persists_both_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let (session, ticket) = signed_in(storage.clone()).await;

        assert!(session.is_authenticated().await);
        assert_eq!(
            storage.get(TOKEN_KEY).await.unwrap().as_deref(),
            Some(ticket.token())
        );
        assert!(storage.get(PROFILE_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_begin_login_rejects_malformed_token() {
        let session = Session::hydrate_at(Arc::new(MemoryStorage::new()), NOW)
            .await
            .unwrap();
        let result = session.begin_login("not-a-token").await;
        assert!(matches!(result, Err(SessionError::MalformedToken)));
    }

    /// Storage that accepts removals but refuses every write
    struct ReadOnlyStorage;

    #[async_trait::async_trait]
    impl SessionStorage for ReadOnlyStorage {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        async fn remove(&self, _keys: &[&str]) -> Result<(), StorageError> {
            Ok(())
        }

        async fn clear(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_begin_login_storage_failure_keeps_memory_clean() {
        let session = Session::hydrate_at(Arc::new(ReadOnlyStorage), NOW)
            .await
            .unwrap();
        let before = session.generation().await;

        let result = session.begin_login(&token_expiring_at(NOW + 60)).await;

        assert!(matches!(result, Err(SessionError::Storage(StorageError::Io(_)))));
        assert!(session.token().await.is_none());
        assert!(session.ticket().await.is_none());
        assert!(session.generation().await > before);
    }

    #[tokio::test]
    async fn test_pending_login_is_not_authenticated() {
        let session = Session::hydrate_at(Arc::new(MemoryStorage::new()), NOW)
            .await
            .unwrap();
        session
            .begin_login(&token_expiring_at(NOW + 60))
            .await
            .unwrap();

        assert!(!session.is_authenticated().await);
        assert!(session.ticket().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_twice_matches_logout_once() {
        let storage = Arc::new(MemoryStorage::new());
        let (session, _) = signed_in(storage.clone()).await;

        session.logout().await.unwrap();
        let once = (session.token().await, session.profile().await);
        session.logout().await.unwrap();
        let twice = (session.token().await, session.profile().await);

        assert_eq!(once, twice);
        assert_eq!(once, (None, None));
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_logouts_converge() {
        let storage = Arc::new(MemoryStorage::new());
        let (session, _) = signed_in(storage.clone()).await;
        let session = Arc::new(session);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = session.clone();
                tokio::spawn(async move { session.logout().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(!session.is_authenticated().await);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_profile_after_logout_does_not_resurrect() {
        let storage = Arc::new(MemoryStorage::new());
        let session = Session::hydrate_at(storage.clone(), NOW).await.unwrap();
        let ticket = session
            .begin_login(&token_expiring_at(NOW + 60))
            .await
            .unwrap();

        session.logout().await.unwrap();
        let result = session.complete_login(&ticket, profile()).await;

        assert!(matches!(result, Err(SessionError::Superseded)));
        assert!(!session.is_authenticated().await);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_abort_login_keeps_newer_session() {
        let storage = Arc::new(MemoryStorage::new());
        let session = Session::hydrate_at(storage, NOW).await.unwrap();
        let stale = session
            .begin_login(&token_expiring_at(NOW + 60))
            .await
            .unwrap();
        let fresh = session
            .begin_login(&token_expiring_at(NOW + 120))
            .await
            .unwrap();
        session.complete_login(&fresh, profile()).await.unwrap();

        session.abort_login(&stale).await.unwrap();

        assert!(session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_unauthorized_signs_out_with_notice() {
        let storage = Arc::new(MemoryStorage::new());
        let (session, ticket) = signed_in(storage.clone()).await;

        session
            .observe_status(&ticket, StatusCode::UNAUTHORIZED)
            .await
            .unwrap();

        assert!(!session.is_authenticated().await);
        assert!(storage.is_empty().await);
        assert_eq!(session.take_notices().await, vec![Notice::SessionExpired]);
        assert!(session.take_notices().await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_unauthorized_raises_one_notice() {
        let (session, ticket) = signed_in(Arc::new(MemoryStorage::new())).await;

        session
            .observe_status(&ticket, StatusCode::UNAUTHORIZED)
            .await
            .unwrap();
        session
            .observe_status(&ticket, StatusCode::UNAUTHORIZED)
            .await
            .unwrap();

        assert_eq!(session.take_notices().await, vec![Notice::SessionExpired]);
    }

    #[tokio::test]
    async fn test_forbidden_keeps_session() {
        let (session, ticket) = signed_in(Arc::new(MemoryStorage::new())).await;

        session
            .observe_status(&ticket, StatusCode::FORBIDDEN)
            .await
            .unwrap();
        session.observe_status(&ticket, StatusCode::OK).await.unwrap();

        assert!(session.is_authenticated().await);
        assert_eq!(session.take_notices().await, vec![Notice::AccessDenied]);
    }

    #[tokio::test]
    async fn test_stale_unauthorized_is_ignored() {
        let (session, old) = signed_in(Arc::new(MemoryStorage::new())).await;
        let ticket = session
            .begin_login(&token_expiring_at(NOW + 600))
            .await
            .unwrap();
        session.complete_login(&ticket, profile()).await.unwrap();

        session
            .observe_status(&old, StatusCode::UNAUTHORIZED)
            .await
            .unwrap();

        assert!(session.is_authenticated().await);
        assert!(session.take_notices().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_profile_requires_session() {
        let (session, ticket) = signed_in(Arc::new(MemoryStorage::new())).await;
        let mut renamed = profile();
        renamed.name = "Annie".to_string();

        session.set_profile(&ticket, renamed.clone()).await.unwrap();
        assert_eq!(session.profile().await, Some(renamed.clone()));

        session.logout().await.unwrap();
        let result = session.set_profile(&ticket, renamed).await;
        assert!(matches!(result, Err(SessionError::NotAuthenticated)));
    }
}
