pub mod applications;
pub mod bot;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/run-bot", post(bot::handle_run_bot))
        .route("/api/stop-bot", post(bot::handle_stop_bot))
        .route("/api/bot-status", get(bot::handle_bot_status))
        .route(
            "/api/applications",
            get(applications::handle_recent_applications),
        )
        .with_state(state)
}
