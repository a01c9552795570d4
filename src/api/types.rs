//! API request and response types

use serde::{Deserialize, Serialize};

/// Request to submit a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Request to replace the input buffer
#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub text: String,
}

/// Response for chat action. Submissions are queued; a rejected one is
/// silently dropped by the session.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
