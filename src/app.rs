use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route("/api/tasks", get(handlers::get_tasks))
        .route("/api/tasks/latest", get(handlers::get_latest_tasks))
        .route("/api/search", get(handlers::search))
        .route("/api/responsibles", get(handlers::get_responsibles))
        .route("/api/responsible-tasks", get(handlers::get_responsible_tasks))
        .route("/api/analytics", get(handlers::get_analytics))
        .route(
            "/api/selected-responsibles",
            get(handlers::get_selected_responsibles).put(handlers::put_selected_responsibles),
        )
        .with_state(state)
}
