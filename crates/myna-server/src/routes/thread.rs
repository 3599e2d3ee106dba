use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Mint a thread up front so a client can hold the id before its first
/// turn. The request body is ignored.
async fn create_thread(State(state): State<AppState>) -> impl IntoResponse {
    match state.relay.create_thread().await {
        Ok(thread_id) => {
            (StatusCode::OK, Json(json!({ "thread_id": thread_id }))).into_response()
        }
        Err(err) => {
            tracing::error!("failed to create thread: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/create-thread", post(create_thread))
        .with_state(state)
}
