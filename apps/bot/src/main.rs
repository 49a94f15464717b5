mod automation;
mod browser;
mod config;
mod db;
mod errors;
mod llm_client;
mod logging;
mod models;
mod platforms;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::automation::ledger::Ledger;
use crate::automation::orchestrator::BrowserRunner;
use crate::automation::registry::RunRegistry;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::logging::{init_tracing, LogBuffer};
use crate::routes::build_router;
use crate::state::AppState;

/// How long shutdown waits for an active run to release its resources.
const RUN_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Console, rotating file and in-memory tail for /api/bot-status
    let logs = LogBuffer::default();
    let _log_guard = init_tracing(&config, &logs)?;

    info!("Starting ApplyBot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Bot config: {}, WebDriver: {}, headless: {}",
        config.bot_config_path.display(),
        config.webdriver_url,
        config.headless
    );

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize SQLite ledger (schema created on first open)
    let ledger = Ledger::open(&config.database_url).await?;

    let registry = RunRegistry::new();
    let state = AppState {
        config: config.clone(),
        ledger: ledger.clone(),
        runner: Arc::new(BrowserRunner::new(config.clone(), Arc::new(llm))),
        registry: registry.clone(),
        logs,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry.clone()))
        .await?;

    // Let a cancelled run reach its cleanup (browser quit, ledger close).
    let deadline = Instant::now() + RUN_DRAIN_TIMEOUT;
    while registry.current().is_some() && Instant::now() < deadline {
        sleep(Duration::from_millis(250)).await;
    }
    if let Some(run) = registry.current() {
        warn!("Run {} still active at exit", run.run_id);
    }

    ledger.close().await;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C after asking any active run to stop.
async fn shutdown_signal(registry: RunRegistry) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    if let Ok(run_id) = registry.stop() {
        info!("Cancelling active run {run_id}");
    }
}
