use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/submit", post(handlers::submit))
        .with_state(state)
}
