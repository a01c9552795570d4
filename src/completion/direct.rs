//! Direct strategy: `OpenAI`-compatible chat completions endpoint

use super::types::{build_history, WireMessage};
use super::{CompletionAdapter, CompletionError};
use crate::conversation::Message;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Direct completion adapter with bearer-token auth
pub struct DirectAdapter {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    directive: String,
}

impl DirectAdapter {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        directive: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            directive: directive.into(),
        })
    }

    fn translate_request(&self, conversation: &[Message], user_text: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: build_history(&self.directive, conversation, user_text),
        }
    }

    /// Map a non-success reply, preferring the provider's own message
    fn error_for_status(status: reqwest::StatusCode, body: &str) -> CompletionError {
        let message = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(resp) => format!("HTTP {status}: {}", resp.error.message),
            Err(_) => format!("HTTP {status} error: {body}"),
        };
        CompletionError::transport(message).with_status(status.as_u16())
    }

    fn normalize_response(body: &str) -> Result<String, CompletionError> {
        let resp: CompletionResponse = serde_json::from_str(body).map_err(|e| {
            CompletionError::malformed(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::malformed("No choices in response"))?;

        choice
            .message
            .content
            .ok_or_else(|| CompletionError::malformed("First choice has no content"))
    }
}

#[async_trait]
impl CompletionAdapter for DirectAdapter {
    async fn complete(
        &self,
        conversation: &[Message],
        user_text: &str,
    ) -> Result<Option<String>, CompletionError> {
        let request = self.translate_request(conversation, user_text);

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::error_for_status(status, &body));
        }

        Self::normalize_response(&body).map(Some)
    }

    fn strategy(&self) -> &str {
        "direct"
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
