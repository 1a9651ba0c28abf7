use agent_backend::adapters::health_handler::HealthHandler;
use agent_backend::application::AgentService;
use agent_backend::cli::Cli;
use agent_backend::config::Settings;
use agent_backend::persistence::DataStore;
use agent_backend::telemetry;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::new_with_cli(&cli)?;
    telemetry::init(&settings.logging)?;

    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting agent backend on {}:{}", host, port);

    // Open the database and bring the schema up to date
    let store = DataStore::new(&settings.database).await?;
    info!("Connected to {} database", store.backend().name());

    if settings.database.auto_migrate {
        let result = store.migrate().await?;
        info!(
            "Migrations complete: {} applied, {} already present",
            result.applied, result.skipped
        );
    } else {
        info!("Skipping migrations on startup");
    }

    let agent_service = Arc::new(AgentService::new(store.agents().clone()));
    let health_handler = Arc::new(HealthHandler::new(store.clone()));

    let app = agent_backend::create_app(agent_service, health_handler);

    // Start server
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, closing database pool");
    store.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
