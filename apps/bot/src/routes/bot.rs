use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::automation::registry::FinishedRun;
use crate::config::BotConfig;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RunBotRequest {
    /// Named account from the bot config; the main login when absent.
    pub account: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunBotResponse {
    pub status: String,
    pub run_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopBotResponse {
    pub status: String,
    pub run_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BotStatusResponse {
    pub running: bool,
    pub stopping: bool,
    pub run_id: Option<Uuid>,
    pub account: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_run: Option<FinishedRun>,
    pub output: Vec<String>,
}

/// POST /api/run-bot
/// Starts a run in the background and returns immediately.
pub async fn handle_run_bot(
    State(state): State<AppState>,
    body: Option<Json<RunBotRequest>>,
) -> Result<(StatusCode, Json<RunBotResponse>), AppError> {
    let request = body.map(|Json(req)| req).unwrap_or_default();

    let bot = BotConfig::load(&state.config.bot_config_path)?;
    let credentials = bot.credentials_for(request.account.as_deref())?.clone();

    let mut ticket = state.registry.try_start(request.account)?;
    let run_id = ticket.run_id();
    let cancel = ticket.cancel_token();
    let runner = state.runner.clone();

    tokio::spawn(
        async move {
            let outcome = match runner.run(bot, credentials, cancel).await {
                Ok(summary) => summary.to_string(),
                Err(e) => {
                    error!("Run failed: {e}");
                    format!("error: {e}")
                }
            };
            ticket.set_outcome(outcome);
        }
        .instrument(tracing::info_span!("run", %run_id)),
    );

    info!("Bot run {run_id} started");
    Ok((
        StatusCode::ACCEPTED,
        Json(RunBotResponse {
            status: "started".to_string(),
            run_id,
        }),
    ))
}

/// POST /api/stop-bot
pub async fn handle_stop_bot(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StopBotResponse>), AppError> {
    let run_id = state.registry.stop()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StopBotResponse {
            status: "stopping".to_string(),
            run_id,
        }),
    ))
}

/// GET /api/bot-status
pub async fn handle_bot_status(State(state): State<AppState>) -> Json<BotStatusResponse> {
    let current = state.registry.current();
    Json(BotStatusResponse {
        running: current.is_some(),
        stopping: current.as_ref().is_some_and(|c| c.stopping),
        run_id: current.as_ref().map(|c| c.run_id),
        account: current.as_ref().and_then(|c| c.account.clone()),
        started_at: current.as_ref().map(|c| c.started_at),
        last_run: state.registry.last_finished(),
        output: state.logs.snapshot(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::Router;
    use serde_json::Value;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use crate::automation::ledger::tests::memory_ledger;
    use crate::automation::ledger::Ledger;
    use crate::automation::orchestrator::{BotRunner, RunError, RunSummary, StopReason};
    use crate::automation::registry::RunRegistry;
    use crate::config::{Config, Credentials};
    use crate::logging::LogBuffer;
    use crate::routes::build_router;
    use crate::state::AppState;

    use super::*;

    /// Runs until cancelled.
    struct WaitingRunner;

    #[async_trait]
    impl BotRunner for WaitingRunner {
        async fn run(
            &self,
            _bot: BotConfig,
            _credentials: Credentials,
            cancel: CancellationToken,
        ) -> Result<RunSummary, RunError> {
            cancel.cancelled().await;
            Ok(RunSummary {
                applied: 0,
                failed: 0,
                skipped: 0,
                stop_reason: StopReason::Cancelled,
            })
        }
    }

    const BOT_YAML: &str = r#"
platform:
  name: linkedin
  username: me@example.com
  password: pw
accounts:
  backup: { username: b@example.com, password: pw2 }
resume_path: resume.pdf
settings:
  keywords: ["Engineer"]
  preferred_locations: ["Remote"]
  max_applications_per_day: 5
"#;

    fn config(bot_config_path: &Path) -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            anthropic_api_key: "test".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            bot_config_path: bot_config_path.to_path_buf(),
            port: 0,
            rust_log: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            log_rotation: "never".to_string(),
            log_max_files: 1,
        }
    }

    pub(crate) fn app_with_ledger(
        bot_config_path: &Path,
        registry: RunRegistry,
        logs: LogBuffer,
        ledger: Ledger,
    ) -> Router {
        build_router(AppState {
            config: config(bot_config_path),
            ledger,
            runner: Arc::new(WaitingRunner),
            registry,
            logs,
        })
    }

    async fn app(bot_config_path: &Path, registry: RunRegistry, logs: LogBuffer) -> Router {
        app_with_ledger(bot_config_path, registry, logs, memory_ledger().await)
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub(crate) async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn bot_config_file(dir: &Path) -> PathBuf {
        let path = dir.join("config.yaml");
        std::fs::write(&path, BOT_YAML).unwrap();
        path
    }

    async fn wait_until_idle(registry: &RunRegistry) {
        for _ in 0..100 {
            if registry.current().is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run did not finish");
    }

    #[tokio::test]
    async fn test_run_stop_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = bot_config_file(dir.path());
        let registry = RunRegistry::new();
        let app = app(&path, registry.clone(), LogBuffer::new(10)).await;

        let response = app
            .clone()
            .oneshot(post("/api/run-bot", r#"{"account":"backup"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "started");

        let second = app.clone().oneshot(post("/api/run-bot", "{}")).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(second).await["error"]["code"], "CONFLICT");

        let status = app
            .clone()
            .oneshot(Request::get("/api/bot-status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = json_body(status).await;
        assert_eq!(status["running"], true);
        assert_eq!(status["account"], "backup");
        assert_eq!(status["run_id"], body["run_id"]);

        let stop = app.clone().oneshot(post("/api/stop-bot", "")).await.unwrap();
        assert_eq!(stop.status(), StatusCode::ACCEPTED);
        assert_eq!(json_body(stop).await["status"], "stopping");

        wait_until_idle(&registry).await;
        let last = registry.last_finished().unwrap();
        assert_eq!(last.outcome, "cancelled: 0 applied, 0 failed, 0 skipped");

        let idle_stop = app.oneshot(post("/api/stop-bot", "")).await.unwrap();
        assert_eq!(idle_stop.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_run_without_body_uses_main_account() {
        let dir = tempfile::tempdir().unwrap();
        let path = bot_config_file(dir.path());
        let registry = RunRegistry::new();
        let app = app(&path, registry.clone(), LogBuffer::new(10)).await;

        let response = app
            .oneshot(Request::post("/api/run-bot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(registry.current().unwrap().account, None);
        registry.stop().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_account_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = bot_config_file(dir.path());
        let registry = RunRegistry::new();
        let app = app(&path, registry.clone(), LogBuffer::new(10)).await;

        let response = app
            .oneshot(post("/api/run-bot", r#"{"account":"ghost"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(registry.current().is_none());
    }

    #[tokio::test]
    async fn test_missing_bot_config_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(
            &dir.path().join("absent.yaml"),
            RunRegistry::new(),
            LogBuffer::new(10),
        )
        .await;

        let response = app.oneshot(post("/api/run-bot", "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_status_when_idle_reports_log_tail() {
        let dir = tempfile::tempdir().unwrap();
        let logs = LogBuffer::new(10);
        logs.push("INFO Logged in to linkedin");
        let app = app(&dir.path().join("config.yaml"), RunRegistry::new(), logs).await;

        let response = app
            .oneshot(Request::get("/api/bot-status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["running"], false);
        assert_eq!(body["output"][0], "INFO Logged in to linkedin");
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(
            &dir.path().join("config.yaml"),
            RunRegistry::new(),
            LogBuffer::new(1),
        )
        .await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }
}
