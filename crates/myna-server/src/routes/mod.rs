// Export route modules
pub mod chat;
pub mod health;
pub mod thread;

use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use serde_json::json;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(thread::routes(state.clone()))
        .merge(health::routes(state))
        .fallback(not_found)
}

/// Unknown paths get the same JSON error shape as everything else.
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}
