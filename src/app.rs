use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/bootstrap", post(handlers::bootstrap))
        .route("/api/retry", post(handlers::retry))
        .route("/api/session/:id", get(handlers::get_session))
        .route("/api/intake", post(handlers::add_intake))
        .route("/api/goal", post(handlers::set_goal))
        .with_state(state)
}
