use crate::state::AppState;
use axum::{
    extract::State,
    http::{self, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use myna::models::event::RelayEvent;
use serde::{Deserialize, Serialize};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TestRequest {
    #[serde(default = "default_test_message")]
    message: String,
    #[serde(default)]
    thread_id: Option<String>,
}

fn default_test_message() -> String {
    "Hello!".to_string()
}

#[derive(Debug, Serialize)]
struct TestResponse {
    response: String,
    thread_id: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Streaming response fed from a channel, used by both chat endpoints.
/// The body stays open until the sender side hangs up.
pub struct StreamResponse {
    rx: ReceiverStream<String>,
    content_type: &'static str,
}

impl StreamResponse {
    fn event_stream(rx: ReceiverStream<String>) -> Self {
        Self {
            rx,
            content_type: "text/event-stream",
        }
    }

    fn plain_text(rx: ReceiverStream<String>) -> Self {
        Self {
            rx,
            content_type: "text/plain",
        }
    }
}

impl Stream for StreamResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for StreamResponse {
    fn into_response(self) -> axum::response::Response {
        let content_type = self.content_type;
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", content_type)
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .body(body)
            .unwrap()
    }
}

// Protocol-specific frame formatting
struct FrameFormatter;

impl FrameFormatter {
    /// `/chat` frames: one JSON object per SSE data line.
    fn json(event: &RelayEvent) -> String {
        let payload = serde_json::to_string(event).unwrap_or_else(|_| String::new());
        format!("data: {}\n\n", payload)
    }

    /// `/chat-plain` frames: raw text plus the legacy status markers.
    fn plain(event: &RelayEvent) -> String {
        let payload = match event {
            RelayEvent::Content { data, .. } => data.clone(),
            RelayEvent::Done { .. } => "[DONE]".to_string(),
            RelayEvent::Error { data, .. } => format!("Error: {}", data),
            RelayEvent::ActionRequired { .. } => "[REQUIRES_ACTION]".to_string(),
        };
        format!("data: {}\n\n", payload)
    }
}

fn validate_message(message: &str) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Message cannot be empty".to_string(),
            }),
        ));
    }
    Ok(())
}

/// Drive one relay turn into the response channel. A failed send means
/// the consumer hung up; that ends the turn and drops the upstream run
/// subscription with it.
fn forward_frames(
    state: AppState,
    message: String,
    thread_id: Option<String>,
    tx: mpsc::Sender<String>,
    format: fn(&RelayEvent) -> String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = state.relay.stream(message, thread_id);
        while let Some(event) = events.next().await {
            if tx.send(format(&event)).await.is_err() {
                tracing::debug!("chat consumer disconnected, dropping run subscription");
                break;
            }
        }
    })
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<StreamResponse, (StatusCode, Json<ErrorResponse>)> {
    validate_message(&request.message)?;

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    forward_frames(
        state,
        request.message,
        request.thread_id,
        tx,
        FrameFormatter::json,
    );

    Ok(StreamResponse::event_stream(ReceiverStream::new(rx)))
}

async fn chat_plain_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<StreamResponse, (StatusCode, Json<ErrorResponse>)> {
    validate_message(&request.message)?;

    let (tx, rx) = mpsc::channel(100);
    forward_frames(
        state,
        request.message,
        request.thread_id,
        tx,
        FrameFormatter::plain,
    );

    Ok(StreamResponse::plain_text(ReceiverStream::new(rx)))
}

// Blocking diagnostic endpoint: one full turn, no streaming
async fn test_handler(
    State(state): State<AppState>,
    Json(request): Json<TestRequest>,
) -> Json<TestResponse> {
    let (response, thread_id) = state.relay.complete(&request.message, request.thread_id).await;

    Json(TestResponse {
        response,
        thread_id,
        model: state.model.clone(),
    })
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat-plain", post(chat_plain_handler))
        .route("/test", post(test_handler))
        .with_state(state)
}
