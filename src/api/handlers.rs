//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ChatRequest, ChatResponse, ErrorResponse, InputRequest, SuccessResponse};
use super::AppState;
use crate::conversation::MessageId;
use crate::session::{SessionClosed, SessionView};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/stream", get(stream_session))
        // User actions
        .route("/api/chat", post(send_chat))
        .route("/api/input", put(set_input))
        .route("/api/bubbles/:id/finished", post(bubble_finished))
        .route("/version", get(get_version))
        .with_state(state)
}

async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.session.view())
}

async fn stream_session(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe first so nothing between the snapshot and the stream is lost
    let broadcast_rx = state.session.subscribe();
    sse_stream(state.session.watch_view(), broadcast_rx)
}

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    state.session.submit(req.text).await?;
    Ok(Json(ChatResponse { queued: true }))
}

async fn set_input(
    State(state): State<AppState>,
    Json(req): Json<InputRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.session.edit_input(req.text).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn bubble_finished(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.session.bubble_finished(MessageId(id)).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn get_version() -> &'static str {
    concat!("ordning ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    Unavailable(String),
}

impl From<SessionClosed> for AppError {
    fn from(e: SessionClosed) -> Self {
        AppError::Unavailable(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
