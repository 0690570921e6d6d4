//! EventHub
//!
//! Main application entry point

use std::net::SocketAddr;
use anyhow::Context;
use tracing::info;

use eventhub::{
    config::Settings,
    database::DatabaseService,
    handlers::{router, AppState},
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate().context("Invalid configuration")?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", eventhub::info());

    // Initialize database
    info!("Connecting to database...");
    let database = DatabaseService::connect(&settings.database)
        .await
        .context("Failed to initialize the database")?;

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, database)?;
    if !services.calendar_service.is_enabled() {
        info!("Google Calendar export is disabled");
    }

    let app = router(AppState::new(services), &settings);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("EventHub listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("EventHub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
