//! Quartermaster HTTP server.
//!
//! Inventory/reservation tracker: connects the Postgres entity store, runs
//! migrations, and serves the accounting API with graceful shutdown.

use std::sync::Arc;

use quartermaster::{
    AppState, Config, InventoryService, PostgresStore, SystemClock, build_router,
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quartermaster=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quartermaster HTTP server");

    // Load configuration
    let config = Config::from_env();
    info!(
        postgres_url = %config.postgres.url,
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // Connect the entity store
    info!("Connecting to entity store database...");
    let store = PostgresStore::connect(&config.postgres).await?;
    info!("Entity store connected");

    // Apply schema migrations
    info!("Running migrations...");
    sqlx::migrate!().run(store.pool()).await?;
    info!("Migrations applied");

    // Build the accounting service and application state
    let service = Arc::new(InventoryService::new(
        Arc::new(store),
        Arc::new(SystemClock),
    ));
    let state = AppState::new(service);

    // Build router
    let app = build_router(state);

    // Create server address
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {addr}");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
