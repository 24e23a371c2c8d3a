//! Axum route handlers for the Generation API.

use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::Stream;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::orchestrator::{GenerationRequest, SessionSnapshot};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub session_id: Uuid,
}

/// Snapshot plus the flags the presentation layer drives its controls from.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    pub validating: bool,
    pub generating: bool,
    pub generating_certification: bool,
    pub certification_available: bool,
    pub export_ready: bool,
}

impl From<SessionSnapshot> for SessionView {
    fn from(snapshot: SessionSnapshot) -> Self {
        let certification_available = snapshot
            .certification
            .as_ref()
            .is_some_and(|c| !c.accumulated_text.is_empty());
        let has_content =
            !snapshot.interview.accumulated_text.trim().is_empty() || certification_available;

        Self {
            validating: snapshot.is_validating(),
            generating: snapshot.is_generating(),
            generating_certification: snapshot.is_generating_certification(),
            certification_available,
            export_ready: snapshot.is_settled() && has_content,
            snapshot,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/generate
///
/// Validates the skillset and launches the streams. Responds once they are
/// running; progress is read from /api/v1/session or /api/v1/session/events.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let session_id = state.orchestrator.submit(request).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { session_id })))
}

/// GET /api/v1/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.orchestrator.snapshot().into())
}

/// POST /api/v1/session/reset
pub async fn handle_reset(State(state): State<AppState>) -> StatusCode {
    state.orchestrator.reset();
    StatusCode::NO_CONTENT
}

/// GET /api/v1/session/events
///
/// Server-sent events: the current view immediately, then one per state change.
pub async fn handle_session_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.orchestrator.subscribe();

    let events = stream! {
        loop {
            let view = SessionView::from(rx.borrow_and_update().clone());
            let payload = serde_json::to_string(&view).unwrap_or_else(|_| "{}".to_string());
            yield Ok(Event::default().event("session").data(payload));

            if rx.changed().await.is_err() {
                break;
            }
        }
    };

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keepalive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::BodyDataStream;
    use axum::response::IntoResponse;
    use futures_util::StreamExt;
    use serde_json::Value;

    use crate::generation::orchestrator::{Orchestrator, SessionPhase, StreamState, StreamStatus};
    use crate::generation::test_support::{Script, ScriptedGenerator};

    /// Reads the body until one full event is buffered; returns its parsed `data`.
    async fn next_view(body: &mut BodyDataStream, buffer: &mut String) -> Value {
        loop {
            if let Some(end) = buffer.find("\n\n") {
                let event: String = buffer.drain(..end + 2).collect();
                assert!(event.contains("event: session"), "unexpected event: {event}");
                let data = event
                    .lines()
                    .find_map(|line| line.strip_prefix("data: "))
                    .expect("event without data");
                return serde_json::from_str(data).unwrap();
            }
            let chunk = body.next().await.expect("event stream ended").unwrap();
            buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    #[tokio::test]
    async fn test_session_events_start_with_current_view_then_follow_changes() {
        let llm = Arc::new(
            ScriptedGenerator::new().with_interview(Script::pending_after(["**A. Basic**"])),
        );
        let orchestrator = Arc::new(Orchestrator::new(llm));
        let state = AppState {
            orchestrator: orchestrator.clone(),
        };

        let response = handle_session_events(State(state)).await.into_response();
        let mut body = response.into_body().into_data_stream();
        let mut buffer = String::new();

        let first = next_view(&mut body, &mut buffer).await;
        assert_eq!(first["phase"], "idle");
        assert_eq!(first["generating"], false);

        let request: GenerationRequest = serde_json::from_str(r#"{"skillset": "Rust"}"#).unwrap();
        orchestrator.submit(request).await.unwrap();

        let streaming = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let view = next_view(&mut body, &mut buffer).await;
                if view["interview"]["accumulated_text"] == "**A. Basic**" {
                    return view;
                }
            }
        })
        .await
        .expect("no event carried the streamed text");
        assert_eq!(streaming["phase"], "orchestrating");
        assert_eq!(streaming["generating"], true);

        orchestrator.reset();
        let reset = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let view = next_view(&mut body, &mut buffer).await;
                if view["phase"] == "idle" {
                    return view;
                }
            }
        })
        .await
        .expect("reset was not published");
        assert_eq!(reset["interview"]["accumulated_text"], "");
    }

    #[test]
    fn test_view_flags_follow_snapshot() {
        let snapshot = SessionSnapshot {
            phase: SessionPhase::Orchestrating,
            interview: StreamState {
                status: StreamStatus::Running,
                accumulated_text: "**A. Basic**".to_string(),
                error: None,
            },
            certification: Some(StreamState {
                status: StreamStatus::Completed,
                accumulated_text: "## About".to_string(),
                error: None,
            }),
            ..SessionSnapshot::default()
        };

        let view = SessionView::from(snapshot);
        assert!(view.generating);
        assert!(!view.generating_certification);
        assert!(view.certification_available);
        assert!(!view.export_ready);
        assert!(!view.validating);
    }

    #[test]
    fn test_view_serializes_flat() {
        let view = SessionView::from(SessionSnapshot::default());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["interview"]["status"], "not_started");
        assert_eq!(json["export_ready"], false);
        assert!(json["certification"].is_null());
    }
}
