use std::sync::Arc;

use crate::generation::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the current generation session and the shared Gemini client.
    pub orchestrator: Arc<Orchestrator>,
}
