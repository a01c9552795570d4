//! Effects produced by state transitions

use super::TurnKind;
use crate::completion::CompletionError;
use crate::conversation::{Author, MessageId};

/// Effects to be executed after a state transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the conversation store
    AppendMessage { author: Author, text: String },

    /// Replace the input buffer
    SetInput { text: String },

    /// Start the single completion call for this turn
    RequestCompletion { kind: TurnKind, user_text: String },

    /// Drop a message from the ephemeral bubble view
    RemoveBubble { id: MessageId },

    /// Operator-facing diagnostics for a failed turn
    LogFailure { kind: TurnKind, error: CompletionError },

    /// Tell observers the controller state changed
    NotifyStateChange,

    /// Tell observers a turn has resolved
    NotifyTurnSettled,
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            author: Author::User,
            text: text.into(),
        }
    }

    pub fn append_ai(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            author: Author::Ai,
            text: text.into(),
        }
    }

    pub fn clear_input() -> Self {
        Effect::SetInput {
            text: String::new(),
        }
    }
}
