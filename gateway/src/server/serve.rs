//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerOptions;
use crate::errors::ServerError;
use crate::server::handlers::{health_handler, root_handler, upload_handler, version_handler};
use crate::server::state::ServerState;

/// Build the gateway router.
pub fn router(state: Arc<ServerState>) -> Router {
    // The default axum body cap is far below a realistic repo archive;
    // replace it with the configured upload bound.
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        // Liveness and version
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Pipeline
        .route("/upload", post(upload_handler))
        // State and middleware
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), ServerError>>, ServerError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr).await.map_err(|e| ServerError::Bind {
        addr: addr.clone(),
        source: e,
    })?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(ServerError::Serve)
    });

    Ok(handle)
}
