use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;

mod handlers;
mod routes;
mod state;

use common::bootstrap::Resources;
use common::config::{load_env_file, Settings};
use common::db::TEMPLATE_SCHEMA;
use common::telemetry;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let env_file = load_env_file(".env");
    let config = Settings::load().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Initialize tracing
    telemetry::init_logging(&config.observability)?;
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting Template Service"
    );
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    // Acquire pool, schema and cache before any listener exists; failures are logged inside
    let mut resources = match Resources::start(&config, &TEMPLATE_SCHEMA).await {
        Ok(resources) => resources,
        Err(e) => {
            telemetry::shutdown_tracer();
            return Err(e.into());
        }
    };
    tracing::info!("Template Service started successfully");

    let served = serve(&resources, config).await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "HTTP server error");
    }

    let released = resources.stop().await;
    tracing::info!("Template Service shut down");
    telemetry::shutdown_tracer();

    served?;
    released?;
    Ok(())
}

/// Bind the listener and serve until a shutdown signal arrives
async fn serve(resources: &Resources, config: Settings) -> Result<()> {
    let db_pool = resources
        .db_pool()
        .cloned()
        .context("Database pool missing after startup")?;
    let cache = resources.cache().cloned();

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    let state = AppState::new(db_pool, cache, config);

    // Template CRUD handlers are merged beside /health and read the same state
    let template_routes: Router<AppState> = Router::new();
    let app = routes::create_router(state, template_routes);

    tracing::info!(addr = %addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Initiating graceful shutdown");
}
