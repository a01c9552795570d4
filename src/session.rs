//! Chat session runtime
//!
//! Owns the conversation store and the turn controller, executes effects,
//! and fans state out to presentation surfaces.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ChatSession;

use crate::completion::CompletionAdapter;
use crate::conversation::{ConversationStore, Message, MessageId};
use crate::turn::{Event, TurnContext, TurnState};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};

/// Events sent to observers (SSE clients, tests)
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Message { message: Message },
    StateChange { state: TurnState, input_enabled: bool },
    Input { text: String },
    BubbleRemoved { id: MessageId },
    TurnSettled,
}

/// Point-in-time picture of the session, published after every transition
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub state: TurnState,
    pub input: String,
    pub input_enabled: bool,
    pub messages: Vec<Message>,
    /// Messages currently floating, in log order. Empty without the bubble view.
    pub bubbles: Vec<Message>,
}

#[derive(Debug, Error)]
#[error("Session has stopped")]
pub struct SessionClosed;

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    view_rx: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Submit the user's text. Rejections (empty, busy) are silent no-ops.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Event::UserSubmit { text: text.into() }).await
    }

    pub async fn edit_input(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Event::InputEdited { text: text.into() }).await
    }

    /// Report that a floating bubble finished its animation
    pub async fn bubble_finished(&self, id: MessageId) -> Result<(), SessionClosed> {
        self.send(Event::BubbleFinished { id }).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    /// Live view receiver; always holds the latest published view
    pub fn watch_view(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }

    async fn send(&self, event: Event) -> Result<(), SessionClosed> {
        self.event_tx.send(event).await.map_err(|_| SessionClosed)
    }
}

/// Start a session on the current tokio runtime. The greeting turn begins
/// immediately.
pub fn spawn_session<A>(
    context: TurnContext,
    store: ConversationStore,
    adapter: Arc<A>,
) -> SessionHandle
where
    A: CompletionAdapter + ?Sized + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);

    let session = ChatSession::new(
        context,
        store,
        adapter,
        event_rx,
        &event_tx,
        broadcast_tx.clone(),
    );
    let view_rx = session.subscribe_view();

    tokio::spawn(session.run());

    SessionHandle {
        event_tx,
        broadcast_tx,
        view_rx,
    }
}
