use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use joule_client::EngineClient;

pub mod api;
pub mod cim;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod repository;
pub mod service;
pub mod storage;
pub mod transport;

use config::CoordinatorConfig;
use dispatch::DispatchEngine;
use dispatch::tables::PartyTables;
use repository::PostgresMetadataStore;
use service::CoordinatorService;
use storage::FsResultStore;
use transport::PostOfficeTransport;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "joule_coordinator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Joule Coordinator...");

    let config = CoordinatorConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // Load party/ownership tables
    let tables = match &config.party_tables_path {
        Some(path) => PartyTables::from_file(path).expect("Failed to load party tables"),
        None => PartyTables::default(),
    };
    let (glns, ownership) = tables.build_registries(&config);

    // Wire up collaborators
    let engine = Arc::new(EngineClient::new(&config.engine_url, &config.engine_token));
    let store = Arc::new(PostgresMetadataStore::new(pool));
    let results = Arc::new(FsResultStore::new(&config.storage_root));
    let transport = Arc::new(PostOfficeTransport::new(&config.post_office_url));
    let dispatch = DispatchEngine::new(glns, ownership);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let service = Arc::new(CoordinatorService::new(
        config.clone(),
        engine,
        store.clone(),
        results,
        transport,
        dispatch,
    ));

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        service,
        store,
        shutdown: shutdown_rx,
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await
        .expect("Failed to start server");
}
