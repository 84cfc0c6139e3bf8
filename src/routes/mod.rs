// HTTP read API over the shared history

mod http;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::history::SharedHistory;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) history: SharedHistory,
}

pub fn app(history: SharedHistory) -> Router {
    let state = AppState { history };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/history", get(http::history_handler)) // GET /api/history
        .route("/api/history/latest", get(http::latest_handler)) // GET /api/history/latest
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
