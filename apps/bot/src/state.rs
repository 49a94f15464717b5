use std::sync::Arc;

use crate::automation::ledger::Ledger;
use crate::automation::orchestrator::BotRunner;
use crate::automation::registry::RunRegistry;
use crate::config::Config;
use crate::logging::LogBuffer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Read side of the ledger; each run opens its own connection.
    pub ledger: Ledger,
    /// Pluggable run driver. Default: `BrowserRunner` (WebDriver + Anthropic).
    pub runner: Arc<dyn BotRunner>,
    pub registry: RunRegistry,
    /// Recent log lines reported by the status endpoint.
    pub logs: LogBuffer,
}
