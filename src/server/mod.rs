//! HTTP proxy for the OAuth exchange and the table API
//!
//! Browsers cannot call the open platform directly (no CORS), so the tracker talks to
//! this service instead. It is stateless: every request carries what it needs, nothing
//! is cached, and upstream failures are returned as `{error}` with status 500.

pub mod models;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::{ConfigError, ServerConfig};
use crate::tables::{OpenPlatformClient, TableApi, TableError};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Table client error: {0}")]
    Table(#[from] TableError),
}

/// Shared across requests
pub struct AppState {
    pub api: Arc<dyn TableApi>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(api: Arc<dyn TableApi>, config: ServerConfig) -> Self {
        Self { api, config }
    }

    /// State backed by the real open platform client
    pub fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        let api = OpenPlatformClient::new(&config.upstream_base_url)?;
        Ok(Self::new(Arc::new(api), config))
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/auth/exchange", post(routes::auth_exchange))
        .route("/table-proxy", post(routes::table_proxy))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Serve on `listener` until `shutdown` resolves
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    log::info!("Proxy server listening on http://{}", addr);

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    log::info!("Proxy server stopped");
    Ok(())
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.socket_addr()?;
    if config.oauth_credentials().is_none() {
        log::warn!("Proxy: no OAuth app credentials configured, /auth/exchange will fail");
    }

    let state = Arc::new(AppState::from_config(config)?);
    let listener = TcpListener::bind(addr).await?;

    run(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        log::info!("Proxy server shutting down");
    })
    .await
}
