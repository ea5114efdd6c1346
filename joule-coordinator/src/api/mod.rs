//! API Module
//!
//! HTTP API layer for the coordinator.
//! Each submodule handles endpoints for a specific concern.

pub mod error;
pub mod health;
pub mod job;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use joule_client::EngineClient;

use crate::repository::MetadataStore;
use crate::service::CoordinatorService;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CoordinatorService<EngineClient>>,
    pub store: Arc<dyn MetadataStore>,
    /// Propagated into poll loops so shutdown cancels supervision cleanly
    pub shutdown: watch::Receiver<bool>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/job/start", post(job::start_job))
        .route("/job/{id}", get(job::get_job))
        // Result endpoints
        .route("/result/handle", post(job::handle_result))
        .route("/result/documents", post(job::build_result_documents))
        // Add state and middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
