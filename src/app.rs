use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(handlers::get_today))
        .route("/api/today/coffee", post(handlers::add_coffee))
        .route("/api/today/coding", post(handlers::log_coding))
        .route("/api/today/mood", post(handlers::set_mood))
        .route("/api/today/wrap-up", post(handlers::wrap_up))
        .route("/api/today/reset", post(handlers::reset_today))
        .route("/api/history", get(handlers::get_history).delete(handlers::clear_history))
        .route("/api/insights", get(handlers::get_insights))
        .route("/api/backup", get(handlers::get_backup))
        .with_state(state)
}
