//! Application state management

use crate::auth::{AuthService, JwtConfig, MemoryUserStore, TokenCodec, UserStore};
use crate::content::{ContentStore, MemoryContentStore};
use moments_core::AppConfig;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Token codec; the signing secret is read-only after startup
    pub codec: Arc<TokenCodec>,
    /// Login, registration and profile lookup
    pub auth: AuthService,
    /// Credential records
    pub users: Arc<dyn UserStore>,
    /// Blogs, comments and moments
    pub content: Arc<dyn ContentStore>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Response counts keyed by (endpoint, status)
    endpoint_metrics: RwLock<BTreeMap<(String, u16), u64>>,
    /// Auth rejections keyed by code
    auth_rejections: RwLock<BTreeMap<&'static str, u64>>,
}

impl AppState {
    /// Create state with in-memory stores
    pub fn new(config: AppConfig) -> Self {
        Self::with_stores(
            config,
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryContentStore::new()),
        )
    }

    /// Create state over the given stores
    pub fn with_stores(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(JwtConfig::from_auth_config(&config.auth)));
        let auth = AuthService::new(&config, codec.clone(), users.clone());

        Self {
            config,
            codec,
            auth,
            users,
            content,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            endpoint_metrics: RwLock::new(BTreeMap::new()),
            auth_rejections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Record one finished request
    pub async fn record_request(&self, endpoint: String, status: u16) {
        *self
            .endpoint_metrics
            .write()
            .await
            .entry((endpoint, status))
            .or_insert(0) += 1;
    }

    /// Record one auth rejection by code
    pub async fn record_rejection(&self, code: &'static str) {
        *self.auth_rejections.write().await.entry(code).or_insert(0) += 1;
    }

    pub async fn endpoint_counts(&self) -> Vec<((String, u16), u64)> {
        self.endpoint_metrics
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub async fn rejection_counts(&self) -> Vec<(&'static str, u64)> {
        self.auth_rejections
            .read()
            .await
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
