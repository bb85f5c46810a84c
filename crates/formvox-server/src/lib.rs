//! HTTP host for voice-driven form sessions.
//!
//! The browser owns the microphone and the speaker. It posts recognizer and
//! playback events to a session, executes the effects returned for each one,
//! and follows the session's SSE stream for updates it did not cause (turn
//! timeouts). Completed answer sets are stored in SQLite.

pub mod api;
pub mod api_sse;
pub mod background;
pub mod config;
pub mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use formvox_db::DbPool;
use formvox_types::SessionConfig;
use formvox_voice::VoiceConfig;
use serde_json::{json, Value};
use sessions::SessionRegistry;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub sessions: SessionRegistry,
    /// Used for sessions created without a config.
    pub defaults: SessionConfig,
    pub voice: VoiceConfig,
}

impl AppState {
    pub fn new(pool: DbPool, defaults: SessionConfig, voice: VoiceConfig) -> Self {
        Self {
            pool,
            sessions: SessionRegistry::default(),
            defaults,
            voice,
        }
    }
}

/// Field lists and events are small.
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(api::create_session_handler))
        .route(
            "/api/sessions/{sessionId}",
            get(api::get_session_handler).delete(api::cancel_session_handler),
        )
        .route(
            "/api/sessions/{sessionId}/events",
            post(api::post_event_handler),
        )
        .route(
            "/api/sessions/{sessionId}/stream",
            get(api_sse::session_stream_handler),
        )
        .route(
            "/api/submissions/{sessionId}",
            get(api::get_submission_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
