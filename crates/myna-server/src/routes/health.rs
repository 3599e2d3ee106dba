use crate::state::AppState;
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    assistant_id: String,
}

/// Liveness probe; also reports which assistant this process serves.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "Assistant relay is running",
        assistant_id: state.relay.assistant_id().to_string(),
    })
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}
