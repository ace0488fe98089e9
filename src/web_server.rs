use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::constants::{
    CHAT_INPUT_MAX_CHARS, MAX_CHARS_EXPERIENCE, MAX_CHARS_NAME, MAX_CHARS_SKILLS, SESSION_IDLE_TIMEOUT_SECS,
};
use crate::generation::{ErrorKind, Generator};
use crate::profile::{Company, Position, Profile, ProfileError};
use crate::session::{InterviewSession, SessionError, SessionSnapshot, TurnOutcome};

type SharedSession = Arc<tokio::sync::Mutex<InterviewSession>>;

struct SessionEntry {
    session: SharedSession,
    last_used: Instant,
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    // Each session has its own lock; the map lock is only held for lookups.
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    idle_timeout: Duration,
    generator: Arc<dyn Generator>,
    model: String,
    stream: bool,
    max_questions: usize,
}

impl AppState {
    pub fn new(generator: Arc<dyn Generator>, model: impl Into<String>, stream: bool, max_questions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout: Duration::from_secs(SESSION_IDLE_TIMEOUT_SECS),
            generator,
            model: model.into(),
            stream,
            max_questions,
        }
    }

    /// Sessions untouched for longer than `idle_timeout` are dropped the next
    /// time a session is created.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn session(&self, id: Uuid) -> Result<SharedSession, ApiError> {
        let mut sessions = self.sessions.lock().map_err(|_| ApiError::Poisoned)?;
        let entry = sessions.get_mut(&id).ok_or(ApiError::UnknownSession(id))?;
        entry.last_used = Instant::now();
        Ok(entry.session.clone())
    }

    fn insert(&self, id: Uuid, session: InterviewSession) -> Result<(), ApiError> {
        let mut sessions = self.sessions.lock().map_err(|_| ApiError::Poisoned)?;
        let before = sessions.len();
        let idle_timeout = self.idle_timeout;
        sessions.retain(|_, entry| entry.last_used.elapsed() < idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, "Evicted idle interview sessions");
        }
        sessions.insert(
            id,
            SessionEntry {
                session: Arc::new(tokio::sync::Mutex::new(session)),
                last_used: Instant::now(),
            },
        );
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no interview session with id {0}")]
    UnknownSession(Uuid),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("invalid profile: {0}")]
    InvalidProfileBody(JsonRejection),
    #[error("invalid answer: {0}")]
    InvalidAnswerBody(JsonRejection),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("session registry is unavailable")]
    Poisoned,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::UnknownSession(_) => (StatusCode::NOT_FOUND, "unknown_session"),
            ApiError::Profile(_) | ApiError::InvalidProfileBody(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_profile"),
            ApiError::InvalidAnswerBody(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_answer"),
            ApiError::Poisoned => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            ApiError::Session(err) => match err {
                SessionError::EmptyAnswer | SessionError::AnswerTooLong { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invalid_answer")
                }
                SessionError::Reply(source) | SessionError::Feedback(source) => match source.kind() {
                    ErrorKind::TransientService => (StatusCode::SERVICE_UNAVAILABLE, "transient_service"),
                    ErrorKind::Generic => (StatusCode::BAD_GATEWAY, "generation_failed"),
                },
                _ => (StatusCode::CONFLICT, "invalid_phase"),
            },
        }
    }

    fn user_message(&self) -> String {
        match self {
            ApiError::Session(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            warn!(%status, error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.user_message(), "kind": kind }))).into_response()
    }
}

#[derive(Serialize)]
struct OptionsResponse {
    positions: Vec<Position>,
    companies: Vec<Company>,
    max_chars_name: usize,
    max_chars_experience: usize,
    max_chars_skills: usize,
    max_chars_answer: usize,
    max_questions: usize,
}

#[derive(Serialize)]
pub struct CreatedSession {
    pub id: Uuid,
    pub session: SessionSnapshot,
}

#[derive(Deserialize)]
struct AnswerRequest {
    answer: String,
}

#[derive(Serialize)]
struct AnswerResponse {
    outcome: TurnOutcome,
    session: SessionSnapshot,
}

#[derive(Serialize)]
struct FeedbackResponse {
    feedback: String,
    session: SessionSnapshot,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/options", get(options_handler))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/start", post(start_session))
        .route("/api/sessions/:id/answers", post(submit_answer))
        .route("/api/sessions/:id/feedback", post(request_feedback))
        .route("/api/sessions/:id/restart", post(restart_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn options_handler(State(state): State<AppState>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        positions: Position::all(),
        companies: Company::all(),
        max_chars_name: MAX_CHARS_NAME,
        max_chars_experience: MAX_CHARS_EXPERIENCE,
        max_chars_skills: MAX_CHARS_SKILLS,
        max_chars_answer: CHAT_INPUT_MAX_CHARS,
        max_questions: state.max_questions,
    })
}

async fn create_session(State(state): State<AppState>) -> Result<(StatusCode, Json<CreatedSession>), ApiError> {
    let id = Uuid::new_v4();
    let session = InterviewSession::new(state.max_questions);
    let snapshot = session.snapshot();
    state.insert(id, session)?;
    info!(%id, "Created interview session");
    Ok((StatusCode::CREATED, Json(CreatedSession { id, session: snapshot })))
}

async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state.session(id)?;
    let session = session.lock().await;
    Ok(Json(session.snapshot()))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    let removed = state.sessions.lock().map_err(|_| ApiError::Poisoned)?.remove(&id);
    match removed {
        Some(_) => {
            info!(%id, "Deleted interview session");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::UnknownSession(id)),
    }
}

async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<Profile>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Json(profile) = body.map_err(ApiError::InvalidProfileBody)?;
    profile.validate()?;
    let session = state.session(id)?;
    let mut session = session.lock().await;
    session.start(profile)?;
    Ok(Json(session.snapshot()))
}

async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let Json(request) = body.map_err(ApiError::InvalidAnswerBody)?;
    let session = state.session(id)?;
    let mut session = session.lock().await;
    let outcome = session
        .submit_answer(state.generator.as_ref(), &state.model, request.answer, state.stream, |_| {})
        .await?;
    Ok(Json(AnswerResponse { outcome, session: session.snapshot() }))
}

/// First call requests feedback; later calls re-issue the same request.
async fn request_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let session = state.session(id)?;
    let mut session = session.lock().await;
    let generator = state.generator.as_ref();
    let feedback = if session.feedback_shown() {
        session.retry_feedback(generator, &state.model, state.stream, |_| {}).await?
    } else {
        session.request_feedback(generator, &state.model, state.stream, |_| {}).await?
    };
    Ok(Json(FeedbackResponse { feedback, session: session.snapshot() }))
}

async fn restart_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state.session(id)?;
    let mut session = session.lock().await;
    session.restart();
    Ok(Json(session.snapshot()))
}

pub async fn start_web_server(port: u16, state: AppState) -> Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Web server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;
    Ok(())
}
