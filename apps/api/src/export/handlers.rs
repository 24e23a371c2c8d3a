use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
};
use chrono::Local;

use crate::errors::AppError;
use crate::export::build_export;
use crate::state::AppState;

/// GET /api/v1/session/export
///
/// Downloads the settled session as a Markdown attachment.
pub async fn handle_export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.orchestrator.snapshot();
    let document = build_export(&snapshot, Local::now().date_naive())?;

    let disposition =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", document.filename))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid export filename: {e}")))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/markdown; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.content,
    ))
}
