//! Turn controller state types

use crate::config::AppConfig;
use serde::{Deserialize, Serialize};

/// What kind of turn is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// Opening greeting requested with an internal directive
    Greeting,
    /// A user submission
    User,
}

/// Controller state. The only admission gate for new submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnState {
    /// Ready for user input
    #[default]
    Idle,

    /// Exactly one completion request in flight
    AwaitingResponse { kind: TurnKind },
}

impl TurnState {
    pub fn is_idle(self) -> bool {
        matches!(self, TurnState::Idle)
    }

    /// The input surface is enabled only while idle
    pub fn input_enabled(self) -> bool {
        self.is_idle()
    }

    pub fn name(self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::AwaitingResponse { .. } => "awaiting_response",
        }
    }
}

/// Fixed texts the controller needs (immutable for the session)
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub session_id: String,
    pub greeting_directive: String,
    pub fallback_reply: String,
    pub greeting_fallback: String,
}

impl TurnContext {
    pub fn new(session_id: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            session_id: session_id.into(),
            greeting_directive: config.greeting_directive.clone(),
            fallback_reply: config.fallback_reply.clone(),
            greeting_fallback: config.greeting_fallback.clone(),
        }
    }

    /// Reply shown when a turn of `kind` fails
    pub fn fallback_for(&self, kind: TurnKind) -> &str {
        match kind {
            TurnKind::Greeting => &self.greeting_fallback,
            TurnKind::User => &self.fallback_reply,
        }
    }
}
