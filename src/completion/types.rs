//! Wire types shared by the completion strategies

use crate::conversation::{Author, Message};
use serde::{Deserialize, Serialize};

/// Role of a message on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    System,
    User,
    Assistant,
}

impl From<Author> for WireRole {
    fn from(author: Author) -> Self {
        match author {
            Author::User => WireRole::User,
            Author::Ai => WireRole::Assistant,
        }
    }
}

/// `{ role, content }` pair as both backends expect it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: WireRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// System directive, then prior messages, then the new user utterance.
pub fn build_history(directive: &str, conversation: &[Message], user_text: &str) -> Vec<WireMessage> {
    let mut history = Vec::with_capacity(conversation.len() + 2);
    history.push(WireMessage::new(WireRole::System, directive));
    history.extend(
        conversation
            .iter()
            .map(|m| WireMessage::new(m.author.into(), m.text.clone())),
    );
    history.push(WireMessage::new(WireRole::User, user_text));
    history
}
