//! Client session against a live API server
//!
//! Each test spawns the router on an ephemeral port and drives it with the
//! real HTTP client.

use moments_api::auth::jwt::unix_now;
use moments_api::create_router_for_testing;
use moments_api::state::AppState;
use moments_client::{
    ApiClient, ClientError, FileStorage, MemoryStorage, Notice, Session, SessionStorage,
    PROFILE_KEY, TOKEN_KEY,
};
use moments_core::{AppConfig, Role};
use std::sync::Arc;
use std::time::Duration;

const ADMIN_EMAIL: &str = "admin@site.com";
const ADMIN_PASSWORD: &str = "Adm1nPass";

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = Some("test-secret".to_string());
    config.auth.admin_email = Some(ADMIN_EMAIL.to_string());
    config.auth.admin_password = Some(ADMIN_PASSWORD.to_string());
    config.auth.argon2_memory_kib = 8192;
    config.auth.argon2_iterations = 1;
    config.auth.argon2_parallelism = 1;
    config
}

async fn spawn_server() -> (String, Arc<AppState>) {
    let (app, state) = create_router_for_testing(test_config());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

async fn client_with(base_url: &str, storage: Arc<dyn SessionStorage>) -> ApiClient {
    let session = Session::hydrate(storage).await.unwrap();
    ApiClient::new(base_url, Arc::new(session))
}

#[tokio::test]
async fn test_admin_login_persists_session() {
    let (url, _) = spawn_server().await;
    let storage = Arc::new(MemoryStorage::new());
    let client = client_with(&url, storage.clone()).await;

    let profile = client.admin_login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    assert_eq!(profile.role, Role::Admin);
    assert!(client.session().is_authenticated().await);
    assert!(storage.get(TOKEN_KEY).await.unwrap().is_some());
    assert!(storage.get(PROFILE_KEY).await.unwrap().is_some());

    let dashboard = client.dashboard().await.unwrap();
    assert_eq!(dashboard.blogs, 0);
}

#[tokio::test]
async fn test_bad_credentials_leave_session_anonymous() {
    let (url, _) = spawn_server().await;
    let client = client_with(&url, Arc::new(MemoryStorage::new())).await;

    let err = client
        .admin_login(ADMIN_EMAIL, "wrong")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.code(), Some("invalid_credentials"));
    assert!(!client.session().is_authenticated().await);
    // A failed login is not an expired session
    assert!(client.session().take_notices().await.is_empty());
}

#[tokio::test]
async fn test_sign_in_with_rejected_token_discards_it() {
    let (url, _) = spawn_server().await;
    let storage = Arc::new(MemoryStorage::new());
    let client = client_with(&url, storage.clone()).await;

    let err = client.sign_in("aaa.bbb.ccc").await.unwrap_err();

    assert_eq!(err.code(), Some("invalid_token"));
    assert!(!client.session().is_authenticated().await);
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_reader_forbidden_stays_signed_in() {
    let (url, _) = spawn_server().await;
    let client = client_with(&url, Arc::new(MemoryStorage::new())).await;
    client
        .register("Rita", "rita@site.com", "Secret123", None)
        .await
        .unwrap();

    let err = client.my_blogs().await.unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert_eq!(err.code(), Some("forbidden"));
    assert!(client.session().is_authenticated().await);
    assert_eq!(
        client.session().take_notices().await,
        vec![Notice::AccessDenied]
    );
}

#[tokio::test]
async fn test_expired_token_signs_out_with_notice() {
    let (url, state) = spawn_server().await;
    let issued = unix_now().unwrap() - 3 * 60 * 60;
    let token = state
        .codec
        .issue_at(ADMIN_EMAIL, Role::Admin, Duration::from_secs(2 * 60 * 60), issued)
        .unwrap();

    // Hydrate with a clock from before expiry so the token survives locally
    let storage = Arc::new(MemoryStorage::with_entries([(TOKEN_KEY, token)]));
    let session = Session::hydrate_at(storage.clone(), issued + 60)
        .await
        .unwrap();
    let client = ApiClient::new(&url, Arc::new(session));
    assert!(client.session().is_authenticated().await);

    let err = client.dashboard().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.code(), Some("token_expired"));
    assert!(!client.session().is_authenticated().await);
    assert!(storage.is_empty().await);
    assert_eq!(
        client.session().take_notices().await,
        vec![Notice::SessionExpired]
    );
}

#[tokio::test]
async fn test_hydrate_expired_token_without_network() {
    let (_, state) = spawn_server().await;
    let issued = unix_now().unwrap() - 3 * 60 * 60;
    let token = state
        .codec
        .issue_at(ADMIN_EMAIL, Role::Admin, Duration::from_secs(2 * 60 * 60), issued)
        .unwrap();
    let storage = Arc::new(MemoryStorage::with_entries([(TOKEN_KEY, token)]));

    // Unroutable address: any request would fail
    let client = client_with("http://127.0.0.1:9", storage.clone()).await;

    assert!(!client.session().is_authenticated().await);
    assert!(storage.is_empty().await);
    assert!(matches!(
        client.dashboard().await,
        Err(ClientError::NotSignedIn)
    ));
}

#[tokio::test]
async fn test_concurrent_unauthorized_converge() {
    let (url, _) = spawn_server().await;
    let mut other = test_config();
    other.auth.jwt_secret = Some("rotated-secret".to_string());
    let (_, other_state) = create_router_for_testing(other);
    let foreign = other_state
        .codec
        .issue(ADMIN_EMAIL, Role::Admin, Duration::from_secs(3600))
        .unwrap();

    let storage = Arc::new(MemoryStorage::with_entries([(TOKEN_KEY, foreign)]));
    let client = client_with(&url, storage.clone()).await;
    assert!(client.session().is_authenticated().await);

    let calls = (0..4).map(|_| client.dashboard());
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap_err().status(), Some(401));
    }
    assert!(!client.session().is_authenticated().await);
    assert!(storage.is_empty().await);
    assert_eq!(
        client.session().take_notices().await,
        vec![Notice::SessionExpired]
    );
}

#[tokio::test]
async fn test_concurrent_logout() {
    let (url, _) = spawn_server().await;
    let storage = Arc::new(MemoryStorage::new());
    let client = client_with(&url, storage.clone()).await;
    client.admin_login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let results = futures::future::join_all((0..8).map(|_| client.logout())).await;

    assert!(results.iter().all(Result::is_ok));
    assert!(!client.session().is_authenticated().await);
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_author_flow_and_session_file() {
    let (url, _) = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let client = client_with(&url, Arc::new(FileStorage::new(&path))).await;
    client
        .register("Ann", "ann@site.com", "Secret123", Some(Role::Author))
        .await
        .unwrap();
    assert!(client.my_blogs().await.unwrap().is_empty());

    // A second process picks the session up from disk
    let reopened = client_with(&url, Arc::new(FileStorage::new(&path))).await;
    assert!(reopened.session().is_authenticated().await);
    assert_eq!(
        reopened.session().profile().await.map(|p| p.email),
        Some("ann@site.com".to_string())
    );

    let profile = reopened.refresh_profile().await.unwrap();
    assert_eq!(profile.role, Role::Author);

    reopened.logout().await.unwrap();
    let after = client_with(&url, Arc::new(FileStorage::new(&path))).await;
    assert!(!after.session().is_authenticated().await);
}
