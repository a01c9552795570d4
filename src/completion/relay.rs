//! Relay strategy: forwards the whole conversation to an automation webhook
//!
//! The relay may answer with JSON in one of several envelope shapes or with
//! plain prose; both are normalized to text.

use super::types::{build_history, WireMessage};
use super::{CompletionAdapter, CompletionError};
use crate::conversation::Message;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Reply extraction strategies, tried in order. Each is total; the first
/// one that yields text wins.
const REPLY_EXTRACTORS: &[ReplyExtractor] = &[
    ReplyExtractor::JsonField("message"),
    ReplyExtractor::JsonField("response"),
    ReplyExtractor::JsonField("text"),
    ReplyExtractor::RawBody,
];

/// Decoded relay reply body
#[derive(Debug)]
pub enum ReplyBody {
    Json(Value),
    Raw(String),
}

impl ReplyBody {
    /// Sniff the body by content type. A body declared as JSON that does not
    /// parse is malformed.
    pub fn decode(content_type: Option<&str>, body: String) -> Result<Self, CompletionError> {
        let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return Ok(ReplyBody::Raw(body));
        }
        serde_json::from_str(&body)
            .map(ReplyBody::Json)
            .map_err(|e| CompletionError::malformed(format!("Invalid JSON from relay: {e}")))
    }
}

#[derive(Debug, Clone, Copy)]
enum ReplyExtractor {
    /// Non-blank string field of a JSON object
    JsonField(&'static str),
    /// Non-JSON body used verbatim
    RawBody,
}

impl ReplyExtractor {
    fn extract(self, body: &ReplyBody) -> Option<String> {
        match (self, body) {
            (ReplyExtractor::JsonField(name), ReplyBody::Json(value)) => value
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
            (ReplyExtractor::RawBody, ReplyBody::Raw(text)) if !text.trim().is_empty() => {
                Some(text.clone())
            }
            _ => None,
        }
    }
}

/// Run the extractor chain. `None` when no extractor yields text.
pub fn extract_reply(body: &ReplyBody) -> Option<String> {
    REPLY_EXTRACTORS
        .iter()
        .find_map(|extractor| extractor.extract(body))
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    user_message: &'a str,
    conversation_history: Vec<WireMessage>,
}

/// Webhook relay adapter
pub struct RelayAdapter {
    client: Client,
    url: String,
    directive: String,
}

impl RelayAdapter {
    pub fn new(
        url: impl Into<String>,
        directive: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            directive: directive.into(),
        })
    }
}

#[async_trait]
impl CompletionAdapter for RelayAdapter {
    async fn complete(
        &self,
        conversation: &[Message],
        user_text: &str,
    ) -> Result<Option<String>, CompletionError> {
        let request = RelayRequest {
            user_message: user_text,
            conversation_history: build_history(&self.directive, conversation, user_text),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::from_reqwest(&e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(
                CompletionError::transport(format!("Relay returned HTTP {status}: {body}"))
                    .with_status(status.as_u16()),
            );
        }

        let reply = ReplyBody::decode(content_type.as_deref(), body)?;
        Ok(extract_reply(&reply))
    }

    fn strategy(&self) -> &str {
        "relay"
    }
}
