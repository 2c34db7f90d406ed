//! Portfolio API Server implementation
//!
//! HTTP REST API server using Axum over the project store.
//! Provides endpoints for projects, procedures, import, export, summary.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::config::AppConfig;
use crate::store::JsonStore;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub version: String,
    pub config: AppConfig,
    /// Serializes read-modify-write cycles on the store file
    pub store: Mutex<JsonStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: Mutex::new(config.store()),
            config,
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Portfolio endpoints
        .route("/api/v1/projects", get(handlers::list_projects))
        .route(
            "/api/v1/projects/:id",
            get(handlers::get_project).put(handlers::put_project),
        )
        .route("/api/v1/procedures", get(handlers::list_procedures))
        .route("/api/v1/import", post(handlers::import_excel))
        .route("/api/v1/export", get(handlers::export))
        .route("/api/v1/summary", get(handlers::summary))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig, app_config: AppConfig) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "afpa_portfolio=info,portfolio_server=info,tower_http=info".into()),
        )
        .init();

    info!("   Store: {}", app_config.store_path.display());
    let app = router(Arc::new(AppState::new(app_config)));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("📊 Portfolio API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/projects, /api/v1/procedures, /api/v1/import, /api/v1/export, /api/v1/summary");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Portfolio API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
