//! # Server Module
//!
//! Application state, router assembly and the listener lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::cookies::CookiePolicy;
use crate::auth::{
    CredentialStore, MemoryCredentialStore, PasswordService, PgCredentialStore, SessionController,
    TokenService,
};
use crate::config::{Config, StoreBackend};
use crate::database::{DatabaseConnection, migrations};
use crate::routes::{auth, health, users};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionController>,
}

impl AppState {
    pub fn new(sessions: SessionController) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }

    /// Wire every component from configuration. Connects and migrates when Postgres-backed.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn CredentialStore> = match config.store {
            StoreBackend::Postgres => {
                let db = DatabaseConnection::new(config.database.clone()).await?;
                migrations::run_migrations(db.pool()).await?;
                Arc::new(PgCredentialStore::new(&db))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory credential store; accounts are lost on restart");
                Arc::new(MemoryCredentialStore::new())
            }
        };

        let tokens = TokenService::from_config(&config.tokens).context("Failed to load token keys")?;
        let passwords = PasswordService::new(config.hashing).context("Invalid password hashing settings")?;
        let cookies = CookiePolicy::from_config(&config.cookies, &config.tokens);

        Ok(Self::new(SessionController::new(
            store,
            passwords,
            Arc::new(tokens),
            cookies,
        )))
    }
}

/// Build the full router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(health::ping))
        .route("/api/healthchecker", get(health::health_checker))
        .merge(auth::create_auth_routes())
        .merge(users::create_user_routes(state.clone()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Binds the configured address and serves until ctrl-c.
pub async fn start(config: Config) -> Result<()> {
    let state = AppState::from_config(&config).await?;
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("🚀 Session server starting...");
    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/api/healthchecker", addr);
    tracing::info!("🔐 Auth endpoints available at http://{}/api/auth/*", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
