//! Generation Orchestrator — validates a request, then drives the interview stream
//! and (for the Certifications sector) the certification stream into session state.
//!
//! Flow: normalize → validate_skillset → spawn stream tasks → join → Settled.
//!
//! State is published through a `watch` channel so the HTTP layer can poll or
//! subscribe. Each stream task is the only writer of its own `StreamState`, and
//! every write is guarded by session id: a superseded session can never touch
//! the state of the session that replaced it. Each session also owns a
//! cancellation token, cancelled on reset or on the next submit, which stops its
//! stream tasks and drops their upstream requests.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::{join, OptionFuture};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::certification::{certification_guide, CERTIFICATIONS_SECTOR};
use crate::generation::interview::{interview_questions, InterviewParams};
use crate::generation::validator::validate_skillset;
use crate::llm_client::{FragmentStream, TextGenerator};

pub const MIN_QUESTIONS: u32 = 1;
pub const MAX_QUESTIONS: u32 = 200;
pub const DEFAULT_QUESTIONS: u32 = 50;

pub const EMPTY_SKILLSET_MESSAGE: &str = "Please enter a skillset.";
pub const INVALID_SKILLSET_MESSAGE: &str = "The entered skillset does not exist or is not a recognized professional or academic skill. Please enter a valid skillset.";
pub const GENERATION_FAILED_MESSAGE: &str =
    "An error occurred while generating questions. Please try again.";
pub const SUPERSEDED_MESSAGE: &str =
    "This generation request was replaced by a newer request or a reset.";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One user-initiated generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub sector: Option<String>,
    pub skillset: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_include_answers")]
    pub include_answers: bool,
    #[serde(default = "default_num_questions")]
    pub num_questions: u32,
}

fn default_include_answers() -> bool {
    true
}

fn default_num_questions() -> u32 {
    DEFAULT_QUESTIONS
}

impl GenerationRequest {
    /// Trims the skillset, drops blank sector/role, and checks the preconditions
    /// that must hold before any service call. Errors are user-facing messages.
    pub fn normalize(self) -> Result<Self, String> {
        let skillset = self.skillset.trim().to_string();
        if skillset.is_empty() {
            return Err(EMPTY_SKILLSET_MESSAGE.to_string());
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.num_questions) {
            return Err(format!(
                "Number of questions must be between {MIN_QUESTIONS} and {MAX_QUESTIONS}."
            ));
        }

        Ok(Self {
            sector: non_blank(self.sector),
            skillset,
            role: non_blank(self.role),
            ..self
        })
    }

    /// Whether this request also gets a certification guide.
    pub fn is_certification(&self) -> bool {
        self.sector.as_deref() == Some(CERTIFICATIONS_SECTOR)
    }

    fn interview_params(&self) -> InterviewParams {
        InterviewParams {
            sector: self.sector.clone(),
            skillset: self.skillset.clone(),
            role: self.role.clone(),
            include_answers: self.include_answers,
            num_questions: self.num_questions,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Interview,
    Certification,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    #[default]
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Normalized, user-safe description of a stream failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
}

/// Progress of one content stream. `accumulated_text` only grows within a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamState {
    pub status: StreamStatus,
    pub accumulated_text: String,
    pub error: Option<ErrorInfo>,
}

impl StreamState {
    fn running() -> Self {
        Self {
            status: StreamStatus::Running,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Validating,
    Rejected,
    Orchestrating,
    Settled,
}

/// Everything the presentation layer can observe about the current session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<Uuid>,
    pub phase: SessionPhase,
    pub request: Option<GenerationRequest>,
    pub interview: StreamState,
    /// Present only when the certification stream was launched.
    pub certification: Option<StreamState>,
    /// Top-level user-facing error.
    pub error: Option<String>,
}

impl SessionSnapshot {
    fn validating(session_id: Uuid, request: GenerationRequest) -> Self {
        Self {
            session_id: Some(session_id),
            phase: SessionPhase::Validating,
            request: Some(request),
            ..Self::default()
        }
    }

    pub fn is_validating(&self) -> bool {
        self.phase == SessionPhase::Validating
    }

    /// The interview stream is running; the submit action stays disabled meanwhile.
    pub fn is_generating(&self) -> bool {
        self.interview.status == StreamStatus::Running
    }

    pub fn is_generating_certification(&self) -> bool {
        self.certification
            .as_ref()
            .is_some_and(|c| c.status == StreamStatus::Running)
    }

    pub fn is_settled(&self) -> bool {
        self.phase == SessionPhase::Settled
    }

    /// A submitted session that has not yet been rejected or settled.
    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Validating | SessionPhase::Orchestrating
        )
    }

    fn stream_mut(&mut self, kind: StreamKind) -> Option<&mut StreamState> {
        match kind {
            StreamKind::Interview => Some(&mut self.interview),
            StreamKind::Certification => self.certification.as_mut(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session publisher
// ────────────────────────────────────────────────────────────────────────────

/// Write handle for one session. Every write is dropped once the session is superseded.
#[derive(Clone)]
struct SessionPublisher {
    session_id: Uuid,
    state: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionPublisher {
    fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) -> bool {
        let session_id = self.session_id;
        self.state.send_if_modified(|snapshot| {
            if snapshot.session_id != Some(session_id) {
                return false;
            }
            f(snapshot);
            true
        })
    }

    fn reject(&self, message: &str) {
        self.update(|s| {
            s.phase = SessionPhase::Rejected;
            s.error = Some(message.to_string());
        });
    }

    fn start_streams(&self, with_certification: bool) {
        self.update(|s| {
            s.phase = SessionPhase::Orchestrating;
            s.interview = StreamState::running();
            s.certification = with_certification.then(StreamState::running);
        });
    }

    fn append(&self, kind: StreamKind, fragment: &str) -> bool {
        self.update(|s| {
            if let Some(stream) = s.stream_mut(kind) {
                stream.accumulated_text.push_str(fragment);
            }
        })
    }

    fn complete(&self, kind: StreamKind) {
        self.update(|s| {
            if let Some(stream) = s.stream_mut(kind) {
                stream.status = StreamStatus::Completed;
            }
        });
    }

    /// Only an interview failure reaches the top-level error.
    fn fail(&self, kind: StreamKind) {
        self.update(|s| {
            if let Some(stream) = s.stream_mut(kind) {
                stream.status = StreamStatus::Failed;
                if kind == StreamKind::Interview {
                    stream.error = Some(ErrorInfo {
                        message: GENERATION_FAILED_MESSAGE.to_string(),
                    });
                }
            }
            if kind == StreamKind::Interview {
                s.error = Some(GENERATION_FAILED_MESSAGE.to_string());
            }
        });
    }

    fn settle(&self) {
        self.update(|s| s.phase = SessionPhase::Settled);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Owns the current session and the shared Text Generation Service client.
pub struct Orchestrator {
    llm: Arc<dyn TextGenerator>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    active: Mutex<Option<CancellationToken>>,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            llm,
            state: Arc::new(state),
            active: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Validates and launches a new session, superseding the current one.
    ///
    /// Returns once the streams are launched; their progress is observable via
    /// `snapshot`/`subscribe`. Input errors return before any service call. They
    /// mark an idle or finished session `Rejected` and leave a running session's
    /// phase and buffers untouched.
    ///
    /// Validation and launch run in their own task, so dropping this future (a
    /// disconnected client) cannot leave the session stuck in `Validating`.
    pub async fn submit(&self, request: GenerationRequest) -> Result<Uuid, AppError> {
        let request = match request.normalize() {
            Ok(request) => request,
            Err(message) => {
                self.state.send_modify(|s| {
                    if !s.is_running() {
                        s.phase = SessionPhase::Rejected;
                    }
                    s.error = Some(message.clone());
                });
                return Err(AppError::Validation(message));
            }
        };

        let session_id = Uuid::new_v4();
        let cancel = self.begin_session(session_id, &request);
        let publisher = SessionPublisher {
            session_id,
            state: self.state.clone(),
        };
        info!(
            %session_id,
            skillset = %request.skillset,
            sector = ?request.sector,
            num_questions = request.num_questions,
            "Generation requested"
        );

        tokio::spawn(validate_and_launch(self.llm.clone(), publisher, request, cancel))
            .await
            .map_err(|e| anyhow::anyhow!("generation task aborted: {e}"))??;

        Ok(session_id)
    }

    /// Clears all session state immediately and cancels in-flight streams.
    pub fn reset(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = active.take() {
            token.cancel();
        }
        self.state.send_replace(SessionSnapshot::default());
        info!("Session reset");
    }

    /// Resolves once `session_id` is settled, rejected, or no longer current.
    pub async fn wait_for_settle(&self, session_id: Uuid) -> SessionSnapshot {
        let mut rx = self.state.subscribe();
        let result = rx
            .wait_for(|s| {
                s.session_id != Some(session_id)
                    || matches!(s.phase, SessionPhase::Settled | SessionPhase::Rejected)
            })
            .await
            .map(|s| s.clone());
        match result {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    /// Cancels the previous session and publishes the new one as `Validating`.
    /// Both happen under the same lock so concurrent submits cannot interleave.
    fn begin_session(&self, session_id: Uuid, request: &GenerationRequest) -> CancellationToken {
        let token = CancellationToken::new();
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.replace(token.clone()) {
            previous.cancel();
        }
        self.state
            .send_replace(SessionSnapshot::validating(session_id, request.clone()));
        token
    }
}

/// Runs the classifier, then either rejects the session or spawns its stream
/// tasks and the task that settles it.
async fn validate_and_launch(
    llm: Arc<dyn TextGenerator>,
    publisher: SessionPublisher,
    request: GenerationRequest,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let session_id = publisher.session_id;
    let valid = validate_skillset(llm.as_ref(), &request.skillset).await;

    if cancel.is_cancelled() {
        debug!(%session_id, "Session superseded during validation");
        return Err(AppError::Conflict(SUPERSEDED_MESSAGE.to_string()));
    }
    if !valid {
        info!(%session_id, skillset = %request.skillset, "Skillset rejected");
        publisher.reject(INVALID_SKILLSET_MESSAGE);
        return Err(AppError::UnprocessableEntity(
            INVALID_SKILLSET_MESSAGE.to_string(),
        ));
    }

    let with_certification = request.is_certification();
    publisher.start_streams(with_certification);

    let interview = tokio::spawn(drive_stream(
        publisher.clone(),
        StreamKind::Interview,
        interview_questions(llm.clone(), request.interview_params()),
        cancel.clone(),
    ));
    let certification = with_certification.then(|| {
        tokio::spawn(drive_stream(
            publisher.clone(),
            StreamKind::Certification,
            certification_guide(llm.clone(), request.skillset.clone()),
            cancel.clone(),
        ))
    });

    tokio::spawn(settle_when_done(publisher, interview, certification, cancel));
    Ok(())
}

/// Consumes one fragment stream into its session buffer until it ends, fails,
/// or the session is cancelled.
async fn drive_stream(
    publisher: SessionPublisher,
    kind: StreamKind,
    mut fragments: FragmentStream,
    cancel: CancellationToken,
) -> StreamOutcome {
    let session_id = publisher.session_id;
    let mut received = 0usize;
    let mut bytes = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%session_id, stream = ?kind, received, "Stream cancelled");
                return StreamOutcome::Cancelled;
            }
            next = fragments.next() => next,
        };

        match next {
            Some(Ok(fragment)) => {
                if fragment.is_empty() {
                    continue;
                }
                received += 1;
                bytes += fragment.len();
                publisher.append(kind, &fragment);
            }
            Some(Err(e)) => {
                match kind {
                    StreamKind::Interview => {
                        error!(%session_id, received, error = %e, "Interview generation failed")
                    }
                    StreamKind::Certification => {
                        warn!(%session_id, received, error = %e, "Certification guide generation failed")
                    }
                }
                publisher.fail(kind);
                return StreamOutcome::Failed;
            }
            None => {
                info!(%session_id, stream = ?kind, fragments = received, bytes, "Stream completed");
                publisher.complete(kind);
                return StreamOutcome::Completed;
            }
        }
    }
}

/// Waits for every launched stream (a join, not a race), then settles the session.
async fn settle_when_done(
    publisher: SessionPublisher,
    interview: JoinHandle<StreamOutcome>,
    certification: Option<JoinHandle<StreamOutcome>>,
    cancel: CancellationToken,
) {
    let (interview, certification) = join(interview, OptionFuture::from(certification)).await;

    let interview = joined_outcome(&publisher, StreamKind::Interview, interview);
    let certification =
        certification.map(|c| joined_outcome(&publisher, StreamKind::Certification, c));

    if cancel.is_cancelled() {
        return;
    }

    publisher.settle();
    info!(
        session_id = %publisher.session_id,
        interview = ?interview,
        certification = ?certification,
        "Session settled"
    );
}

fn joined_outcome(
    publisher: &SessionPublisher,
    kind: StreamKind,
    joined: Result<StreamOutcome, JoinError>,
) -> StreamOutcome {
    joined.unwrap_or_else(|e| {
        error!(session_id = %publisher.session_id, stream = ?kind, error = %e, "Stream task aborted");
        publisher.fail(kind);
        StreamOutcome::Failed
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
