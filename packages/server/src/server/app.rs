//! Application setup and server configuration.

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domains::emails::actions::RunSettings;
use crate::kernel::ServerDeps;
use crate::server::routes::{find_emails_handler, find_emails_stream_handler, health_handler};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: Arc<ServerDeps>,
    /// Artifacts and fan-out every run started over HTTP uses
    pub run_settings: RunSettings,
}

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>, run_settings: RunSettings) -> Router {
    let app_state = AxumAppState { deps, run_settings };

    Router::new()
        .route("/find_emails", get(find_emails_handler))
        .route("/find_emails/stream", get(find_emails_stream_handler))
        .route("/health", get(health_handler))
        .layer(Extension(app_state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
