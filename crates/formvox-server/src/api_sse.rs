//! SSE stream of session updates.

use crate::api::{lookup_session, parse_session_id, ApiError};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::{sse::Event, Sse},
};
use futures_util::Stream;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Handler for `GET /api/sessions/{sessionId}/stream`.
///
/// Streams every update of the session, including those caused by turn
/// timeouts that no request triggered. Each message is a JSON
/// `{snapshot, effects}` object sent as an `update` event.
pub async fn session_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let shared = lookup_session(&state, session_id).await?;
    let rx = shared
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .updates
        .subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(update) => match serde_json::to_string(&update) {
            Ok(data) => Some(Ok(Event::default().event("update").data(data))),
            Err(e) => {
                tracing::error!("failed to serialize session update: {}", e);
                None
            }
        },
        Err(broadcast_error) => {
            tracing::warn!(
                %session_id,
                error = %broadcast_error,
                "session SSE stream lagged; updates were dropped for this subscriber"
            );
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::default()))
}
