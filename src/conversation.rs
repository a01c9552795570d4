//! Conversation store
//!
//! Append-only log of the messages exchanged in a session, plus the
//! ephemeral "floating bubble" view layered over it. The ephemeral view is a
//! set of message ids, never a second copy of message content.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Range (percent of viewport height) a floating bubble starts from.
const BUBBLE_START_RANGE: std::ops::Range<f32> = 10.0..25.0;

/// Monotonic message identifier, unique within a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Ai,
}

/// A message in the conversation log. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub text: String,
    /// Bubble start offset; only set when the ephemeral view is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_pos: Option<f32>,
    pub created_at: DateTime<Utc>,
}

/// Append-only conversation log with an optional ephemeral view
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    /// Ids currently shown as floating bubbles, in append order.
    /// `None` when the session runs without the bubble view.
    ephemeral: Option<Vec<MessageId>>,
    next_id: u64,
}

impl ConversationStore {
    /// Store without an ephemeral view
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that mirrors every append into the ephemeral bubble set
    pub fn with_bubbles() -> Self {
        Self {
            ephemeral: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn has_bubbles(&self) -> bool {
        self.ephemeral.is_some()
    }

    /// Append a message. Never fails; the log grows for the session lifetime.
    pub fn append(&mut self, author: Author, text: impl Into<String>) -> Message {
        self.next_id += 1;
        let id = MessageId(self.next_id);

        let start_pos = self
            .has_bubbles()
            .then(|| rand::thread_rng().gen_range(BUBBLE_START_RANGE));

        let message = Message {
            id,
            author,
            text: text.into(),
            start_pos,
            created_at: Utc::now(),
        };
        self.messages.push(message.clone());
        self.append_ephemeral(id);
        message
    }

    /// The durable log in insertion order
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Messages strictly before `id`, in order
    pub fn history_before(&self, id: MessageId) -> Vec<Message> {
        self.messages
            .iter()
            .take_while(|m| m.id != id)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        // Ids are assigned in increasing order, so the log is sorted by id
        self.messages
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|idx| &self.messages[idx])
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)] // pairs with len()
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Show a logged message as a bubble. Returns false when the view is
    /// disabled, the id is unknown, or it is already displayed.
    pub fn append_ephemeral(&mut self, id: MessageId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        match &mut self.ephemeral {
            Some(ids) if !ids.contains(&id) => {
                ids.push(id);
                true
            }
            _ => false,
        }
    }

    /// Drop a bubble. The durable log is untouched.
    pub fn remove_ephemeral(&mut self, id: MessageId) -> bool {
        let Some(ids) = &mut self.ephemeral else {
            return false;
        };
        let before = ids.len();
        ids.retain(|shown| *shown != id);
        ids.len() != before
    }

    /// Messages currently displayed as bubbles, in log order
    pub fn ephemeral(&self) -> Vec<Message> {
        let Some(ids) = &self.ephemeral else {
            return Vec::new();
        };
        self.messages
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect()
    }
}
