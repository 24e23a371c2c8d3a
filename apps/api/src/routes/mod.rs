pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::export::handlers as export;
use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation API
        .route("/api/v1/generate", post(handlers::handle_generate))
        .route("/api/v1/session", get(handlers::handle_get_session))
        .route(
            "/api/v1/session/events",
            get(handlers::handle_session_events),
        )
        .route("/api/v1/session/reset", post(handlers::handle_reset))
        // Export API
        .route("/api/v1/session/export", get(export::handle_export))
        .with_state(state)
}
