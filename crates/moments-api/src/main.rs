//! Moments API Server

use anyhow::Context;
use moments_api::auth::{MemoryUserStore, PgUserStore, UserStore};
use moments_api::content::MemoryContentStore;
use moments_api::{create_router, state::AppState};
use moments_core::{AppConfig, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging);
    tracing::debug!(?config, "Configuration loaded");

    if config.auth.jwt_secret.is_none() {
        tracing::error!("JWT_SECRET is not set; every login and protected route will fail");
    }
    if config.auth.admin_email.is_none() || config.auth.admin_password.is_none() {
        tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD are not set; admin login is disabled");
    }

    // Pick the credential store
    let users: Arc<dyn UserStore> = match config.database.url.as_deref() {
        Some(url) => {
            let store = PgUserStore::connect(url, config.database.max_connections)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Using PostgreSQL user store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; accounts are kept in memory only");
            Arc::new(MemoryUserStore::new())
        }
    };

    let addr = config.server.bind_address();
    let state = Arc::new(AppState::with_stores(
        config,
        users,
        Arc::new(MemoryContentStore::new()),
    ));

    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Moments API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutting down");
}
