// GET handlers: version, history, latest entry

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::history::HistoryError;

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/history — every entry, oldest first; the last one is usually the live slot.
pub(super) async fn history_handler(State(state): State<AppState>) -> Response {
    match state.history.get_history() {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => poisoned(e),
    }
}

/// GET /api/history/latest — newest entry, 404 before the first sample.
pub(super) async fn latest_handler(State(state): State<AppState>) -> Response {
    match state.history.latest() {
        Ok(Some(entry)) => Json(entry).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => poisoned(e),
    }
}

fn poisoned(e: HistoryError) -> Response {
    tracing::error!(error = %e, operation = "get_history", "history unavailable");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}
