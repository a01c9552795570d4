//! Chat session executor

use super::{SessionEvent, SessionView};
use crate::completion::CompletionAdapter;
use crate::conversation::{Author, ConversationStore, Message, MessageId};
use crate::turn::{transition, Effect, Event, TurnContext, TurnKind, TurnState};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Single-session runtime. One task, one store, one controller.
pub struct ChatSession<A>
where
    A: CompletionAdapter + ?Sized + 'static,
{
    context: TurnContext,
    state: TurnState,
    input: String,
    store: ConversationStore,
    adapter: Arc<A>,
    /// User message of the turn in flight; its history excludes it
    pending_user_message: Option<MessageId>,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so the loop ends once every handle is dropped
    event_tx: mpsc::WeakSender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    view_tx: watch::Sender<SessionView>,
}

impl<A> ChatSession<A>
where
    A: CompletionAdapter + ?Sized + 'static,
{
    pub fn new(
        context: TurnContext,
        store: ConversationStore,
        adapter: Arc<A>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: &mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let state = TurnState::Idle;
        let initial = SessionView {
            session_id: context.session_id.clone(),
            state,
            input: String::new(),
            // Locked until the greeting settles
            input_enabled: false,
            messages: store.snapshot(),
            bubbles: store.ephemeral(),
        };
        let (view_tx, _) = watch::channel(initial);

        Self {
            context,
            state,
            input: String::new(),
            store,
            adapter,
            pending_user_message: None,
            event_rx,
            event_tx: event_tx.downgrade(),
            broadcast_tx,
            view_tx,
        }
    }

    pub fn subscribe_view(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            strategy = self.adapter.strategy(),
            bubbles = self.store.has_bubbles(),
            "Starting chat session"
        );

        self.process_event(Event::SessionStarted);

        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event);
        }

        tracing::info!(
            session_id = %self.context.session_id,
            messages = self.store.len(),
            "Chat session stopped"
        );
    }

    fn process_event(&mut self, event: Event) {
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                // Rejected input is a silent no-op for the user
                tracing::debug!(
                    session_id = %self.context.session_id,
                    state = self.state.name(),
                    reason = %e,
                    "Event rejected"
                );
                return;
            }
        };

        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.view_tx.send_replace(self.view());
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage { author, text } => {
                let message = self.store.append(author, text);
                if author == Author::User {
                    self.pending_user_message = Some(message.id);
                }
                self.broadcast(SessionEvent::Message { message });
            }

            Effect::SetInput { text } => {
                self.input.clone_from(&text);
                self.broadcast(SessionEvent::Input { text });
            }

            Effect::RequestCompletion { kind, user_text } => {
                let history = self.history_for(kind);
                self.spawn_completion(kind, history, user_text);
            }

            Effect::RemoveBubble { id } => {
                if self.store.remove_ephemeral(id) {
                    self.broadcast(SessionEvent::BubbleRemoved { id });
                }
            }

            Effect::LogFailure { kind, error } => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    turn = ?kind,
                    error_kind = error.kind.as_str(),
                    status = ?error.status,
                    error = %error,
                    "Turn failed, showing fallback reply"
                );
            }

            Effect::NotifyStateChange => {
                self.broadcast(SessionEvent::StateChange {
                    state: self.state,
                    input_enabled: self.state.input_enabled(),
                });
            }

            Effect::NotifyTurnSettled => {
                self.pending_user_message = None;
                self.broadcast(SessionEvent::TurnSettled);
            }
        }
    }

    /// Conversation to send alongside the new utterance
    fn history_for(&self, kind: TurnKind) -> Vec<Message> {
        match (kind, self.pending_user_message) {
            (TurnKind::User, Some(id)) => self.store.history_before(id),
            _ => self.store.snapshot(),
        }
    }

    fn spawn_completion(&self, kind: TurnKind, history: Vec<Message>, user_text: String) {
        let adapter = self.adapter.clone();
        let event_tx = self.event_tx.clone();
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            tracing::debug!(
                session_id = %session_id,
                turn = ?kind,
                history_len = history.len(),
                "Requesting completion"
            );

            let event = match adapter.complete(&history, &user_text).await {
                Ok(Some(text)) => Event::CompletionSucceeded { text },
                Ok(None) => {
                    tracing::info!(session_id = %session_id, turn = ?kind, "Reply carried no text");
                    Event::CompletionEmpty
                }
                Err(error) => Event::CompletionFailed { error },
            };

            match event_tx.upgrade() {
                Some(tx) => {
                    let _ = tx.send(event).await;
                }
                None => tracing::debug!(session_id = %session_id, "Session gone, dropping reply"),
            }
        });
    }

    fn broadcast(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }

    fn view(&self) -> SessionView {
        SessionView {
            session_id: self.context.session_id.clone(),
            state: self.state,
            input: self.input.clone(),
            input_enabled: self.state.input_enabled(),
            messages: self.store.snapshot(),
            bubbles: self.store.ephemeral(),
        }
    }
}
