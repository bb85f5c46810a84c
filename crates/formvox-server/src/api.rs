//! API handlers for hosted form sessions.

use crate::sessions::{
    apply_event, HostedSession, SessionUpdate, SharedSession, SqliteSubmissionSink,
};
use crate::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use formvox_db::get_submission;
use formvox_engine::{EngineError, SessionController, SessionEvent};
use formvox_types::{FieldSpec, SessionConfig, SessionSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Request body for `POST /api/sessions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Ordered field list; fixed for the lifetime of the session.
    pub fields: Vec<FieldSpec>,
    /// Overrides the server's `[session]` defaults.
    #[serde(default)]
    pub config: Option<SessionConfig>,
    /// Whether the browser has a speech recognizer.
    #[serde(default = "default_recognition_available")]
    pub recognition_available: bool,
    /// "Today" for relative dates. Defaults to the server's local date.
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

fn default_recognition_available() -> bool {
    true
}

/// Response body for session creation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub snapshot: SessionSnapshot,
}

/// Response body for a stored submission.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub session_id: String,
    pub field_count: usize,
    pub values: BTreeMap<String, String>,
    pub submitted_at: String,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidFieldList(msg) => ApiError::BadRequest(msg),
            EngineError::SessionClosed => ApiError::Conflict(e.to_string()),
            EngineError::Submission(msg) => ApiError::InternalServerError(msg),
        }
    }
}

pub(crate) fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid session id: {}", raw)))
}

/// Finds a live session. A session that is gone but left a stored
/// submission is a conflict rather than a miss.
pub(crate) async fn lookup_session(
    state: &Arc<AppState>,
    session_id: Uuid,
) -> Result<SharedSession, ApiError> {
    if let Some(shared) = state.sessions.get(&session_id) {
        return Ok(shared);
    }

    let pool = state.pool.clone();
    let submitted = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        get_submission(&conn, &session_id.to_string())
            .map(|stored| stored.is_some())
            .map_err(|e| ApiError::InternalServerError(format!("db query failed: {}", e)))
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    if submitted {
        Err(ApiError::Conflict(format!(
            "session {} was already submitted",
            session_id
        )))
    } else {
        Err(ApiError::NotFound(format!("session {} not found", session_id)))
    }
}

/// Handler for `POST /api/sessions`.
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let session_id = Uuid::new_v4();
    let config = payload.config.unwrap_or(state.defaults);
    let reference_date = payload
        .reference_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let sink = SqliteSubmissionSink::new(state.pool.clone(), session_id, payload.fields.len());

    let controller = SessionController::new(
        payload.fields,
        config,
        payload.recognition_available,
        reference_date,
        Box::new(sink),
    )?;
    let snapshot = controller.snapshot();
    state
        .sessions
        .insert(session_id, HostedSession::new(controller));

    tracing::info!(
        %session_id,
        fields = snapshot.field_count,
        recognition_available = payload.recognition_available,
        "session hosted"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            snapshot,
        }),
    ))
}

/// Handler for `GET /api/sessions/{sessionId}`.
pub async fn get_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let shared = lookup_session(&state, session_id).await?;
    let snapshot = shared
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .controller
        .snapshot();
    Ok(Json(snapshot))
}

/// Handler for `POST /api/sessions/{sessionId}/events`.
///
/// Applies one event and returns the resulting snapshot with the effects the
/// browser must execute in order.
pub async fn post_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(event): Json<SessionEvent>,
) -> Result<Json<SessionUpdate>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let shared = lookup_session(&state, session_id).await?;
    let voice = state.voice.clone();

    // Submission writes to the database.
    let update = tokio::task::spawn_blocking(move || {
        apply_event(&shared, session_id, event, &voice)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    // The answers now live in the submissions table.
    if update.snapshot.submitted {
        state.sessions.close(&session_id);
    }

    Ok(Json(update))
}

/// Handler for `DELETE /api/sessions/{sessionId}`.
pub async fn cancel_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    if state.sessions.cancel(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "session {} not found",
            session_id
        )))
    }
}

/// Handler for `GET /api/submissions/{sessionId}`.
pub async fn get_submission_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let session_id = parse_session_id(&session_id)?.to_string();

    let stored = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        get_submission(&conn, &session_id)
            .map_err(|e| ApiError::InternalServerError(format!("db query failed: {}", e)))?
            .ok_or_else(|| ApiError::NotFound(format!("no submission for {}", session_id)))
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(SubmissionResponse {
        session_id: stored.session_id,
        field_count: stored.field_count,
        values: stored.values,
        submitted_at: stored.submitted_at,
    }))
}
