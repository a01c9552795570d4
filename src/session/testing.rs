//! Mock adapters and a session harness for testing
//!
//! These enable end-to-end session tests without network I/O.

use super::{spawn_session, SessionEvent, SessionHandle, SessionView};
use crate::completion::{CompletionAdapter, CompletionError};
use crate::config::{AppConfig, Backend};
use crate::conversation::{ConversationStore, Message};
use crate::turn::TurnContext;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Mock Adapter
// ============================================================================

/// Recorded call to `complete`
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub conversation: Vec<Message>,
    pub user_text: String,
}

/// Mock adapter that returns queued replies
pub struct MockAdapter {
    replies: Mutex<VecDeque<Result<Option<String>, CompletionError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_reply(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(Some(text.into())));
    }

    /// Answer without any usable text
    pub fn queue_empty(&self) {
        self.replies.lock().unwrap().push_back(Ok(None));
    }

    pub fn queue_error(&self, error: CompletionError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next(
        &self,
        conversation: &[Message],
        user_text: &str,
    ) -> Result<Option<String>, CompletionError> {
        self.calls.lock().unwrap().push(RecordedCall {
            conversation: conversation.to_vec(),
            user_text: user_text.to_string(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::transport("No mock reply queued")))
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionAdapter for MockAdapter {
    async fn complete(
        &self,
        conversation: &[Message],
        user_text: &str,
    ) -> Result<Option<String>, CompletionError> {
        self.next(conversation, user_text)
    }

    fn strategy(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Gated Mock Adapter (holds each request until released)
// ============================================================================

pub struct GatedMockAdapter {
    inner: MockAdapter,
    gate: Notify,
}

impl GatedMockAdapter {
    pub fn new() -> Self {
        Self {
            inner: MockAdapter::new(),
            gate: Notify::new(),
        }
    }

    pub fn queue_reply(&self, text: impl Into<String>) {
        self.inner.queue_reply(text);
    }

    /// Let one pending (or the next) request finish
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.inner.recorded_calls()
    }
}

impl Default for GatedMockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionAdapter for GatedMockAdapter {
    async fn complete(
        &self,
        conversation: &[Message],
        user_text: &str,
    ) -> Result<Option<String>, CompletionError> {
        let reply = self.inner.next(conversation, user_text);
        self.gate.notified().await;
        reply
    }

    fn strategy(&self) -> &str {
        "gated-mock"
    }
}

// ============================================================================
// Test Session
// ============================================================================

pub fn test_config() -> AppConfig {
    AppConfig::for_tests(Backend::Relay {
        url: "http://localhost/webhook".to_string(),
    })
}

pub struct TestSession<A: CompletionAdapter + 'static> {
    pub handle: SessionHandle,
    pub adapter: Arc<A>,
    pub config: AppConfig,
}

impl<A: CompletionAdapter + 'static> TestSession<A> {
    pub fn start(adapter: A, bubbles: bool) -> Self {
        let config = AppConfig {
            bubbles,
            ..test_config()
        };
        let store = if bubbles {
            ConversationStore::with_bubbles()
        } else {
            ConversationStore::new()
        };
        let adapter = Arc::new(adapter);
        let handle = spawn_session(
            TurnContext::new("test-session", &config),
            store,
            adapter.clone(),
        );
        Self {
            handle,
            adapter,
            config,
        }
    }

    /// Wait until the published view satisfies `pred`
    pub async fn wait_for(
        &self,
        timeout: Duration,
        pred: impl Fn(&SessionView) -> bool,
    ) -> Option<SessionView> {
        let mut rx = self.handle.view_rx.clone();
        let wait = async {
            loop {
                {
                    let view = rx.borrow_and_update();
                    if pred(&view) {
                        return Some(view.clone());
                    }
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }

    /// Wait until `count` messages exist and input is enabled again
    pub async fn wait_settled(&self, count: usize) -> SessionView {
        self.wait_for(Duration::from_secs(2), |v| {
            v.input_enabled && v.messages.len() >= count
        })
        .await
        .expect("session did not settle in time")
    }
}

/// Collect broadcast events until a turn settles
pub async fn collect_until_settled(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        let settled = matches!(event, SessionEvent::TurnSettled);
        events.push(event);
        if settled {
            break;
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::stub::{spawn_stub, StubReply};
    use crate::completion::RelayAdapter;
    use crate::conversation::Author;
    use crate::turn::{TurnKind, TurnState};
    use serde_json::json;

    const GREETING: &str = "Hej! Välkommen till ORDNING.";

    fn texts(view: &SessionView) -> Vec<(Author, &str)> {
        view.messages
            .iter()
            .map(|m| (m.author, m.text.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn test_mock_adapter_queue() {
        let mock = MockAdapter::new();
        mock.queue_reply("Hello");

        assert_eq!(mock.complete(&[], "Hi").await.unwrap().as_deref(), Some("Hello"));
        // Nothing queued -> transport error
        assert!(mock.complete(&[], "Hi").await.is_err());
        assert_eq!(mock.recorded_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_greeting_then_user_turn() {
        let mock = MockAdapter::new();
        mock.queue_reply(GREETING);
        mock.queue_reply("Hej! Hur kan jag hjälpa dig?");
        let session = TestSession::start(mock, false);

        let view = session.wait_settled(1).await;
        assert_eq!(texts(&view), vec![(Author::Ai, GREETING)]);

        session.handle.submit("Hej").await.unwrap();
        let view = session.wait_settled(3).await;

        assert_eq!(
            texts(&view),
            vec![
                (Author::Ai, GREETING),
                (Author::User, "Hej"),
                (Author::Ai, "Hej! Hur kan jag hjälpa dig?"),
            ]
        );
        assert_eq!(view.state, TurnState::Idle);
        assert_eq!(view.input, "");

        let calls = session.adapter.recorded_calls();
        assert_eq!(calls.len(), 2);
        // Greeting: internal directive, no prior conversation
        assert!(calls[0].conversation.is_empty());
        assert_eq!(calls[0].user_text, session.config.greeting_directive);
        // User turn: history excludes the new utterance
        assert_eq!(calls[1].user_text, "Hej");
        assert_eq!(calls[1].conversation.len(), 1);
        assert_eq!(calls[1].conversation[0].text, GREETING);
    }

    #[tokio::test]
    async fn test_transport_failure_shows_fallback() {
        let mock = MockAdapter::new();
        mock.queue_reply(GREETING);
        mock.queue_error(CompletionError::transport("Connection failed").with_status(502));
        let session = TestSession::start(mock, false);
        session.wait_settled(1).await;

        session.handle.submit("Vad händer?").await.unwrap();
        let view = session.wait_settled(3).await;

        let last = view.messages.last().unwrap();
        assert_eq!(last.author, Author::Ai);
        assert_eq!(last.text, session.config.fallback_reply);
        assert!(!last.text.contains("Connection failed"));
    }

    #[tokio::test]
    async fn test_greeting_failure_uses_greeting_fallback() {
        // Nothing queued: the greeting request fails
        let session = TestSession::start(MockAdapter::new(), false);

        let view = session.wait_settled(1).await;
        assert_eq!(
            texts(&view),
            vec![(Author::Ai, session.config.greeting_fallback.as_str())]
        );
        // The directive never shows up as a user message
        assert!(view.messages.iter().all(|m| m.author != Author::User));
    }

    #[tokio::test]
    async fn test_greeting_without_text_uses_greeting_fallback() {
        let stub = spawn_stub(StubReply::json(200, json!({ "status": "ok" }))).await;
        let relay = RelayAdapter::new(&stub.url, "persona", Duration::from_secs(5)).unwrap();
        let session = TestSession::start(relay, false);

        let view = session.wait_settled(1).await;
        assert_eq!(
            texts(&view),
            vec![(Author::Ai, session.config.greeting_fallback.as_str())]
        );
        assert_ne!(session.config.greeting_fallback, session.config.fallback_reply);
    }

    #[tokio::test]
    async fn test_user_turn_without_text_uses_fallback() {
        let mock = MockAdapter::new();
        mock.queue_reply(GREETING);
        mock.queue_empty();
        let session = TestSession::start(mock, false);
        session.wait_settled(1).await;

        session.handle.submit("Hej").await.unwrap();
        let view = session.wait_settled(3).await;

        let last = view.messages.last().unwrap();
        assert_eq!(last.author, Author::Ai);
        assert_eq!(last.text, session.config.fallback_reply);
    }

    #[tokio::test]
    async fn test_whitespace_submit_is_noop() {
        let mock = MockAdapter::new();
        mock.queue_reply(GREETING);
        mock.queue_reply("Svar");
        let session = TestSession::start(mock, false);
        session.wait_settled(1).await;

        session.handle.submit("   \n").await.unwrap();
        session.handle.submit("Hej").await.unwrap();
        let view = session.wait_settled(3).await;

        assert_eq!(view.messages.len(), 3);
        assert_eq!(view.messages[1].text, "Hej");
        assert_eq!(session.adapter.recorded_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_while_awaiting_is_dropped() {
        let gated = GatedMockAdapter::new();
        gated.queue_reply(GREETING);
        gated.queue_reply("first reply");
        gated.release();
        let session = TestSession::start(gated, false);
        session.wait_settled(1).await;

        session.handle.submit("first").await.unwrap();
        let view = session
            .wait_for(Duration::from_secs(2), |v| v.messages.len() == 2)
            .await
            .unwrap();
        assert_eq!(
            view.state,
            TurnState::AwaitingResponse {
                kind: TurnKind::User
            }
        );
        assert!(!view.input_enabled);

        session.handle.submit("second").await.unwrap();
        session.handle.edit_input("typing").await.unwrap();
        session.adapter.release();

        let view = session.wait_settled(3).await;
        assert_eq!(
            texts(&view),
            vec![
                (Author::Ai, GREETING),
                (Author::User, "first"),
                (Author::Ai, "first reply"),
            ]
        );
        assert_eq!(view.input, "");
        assert_eq!(session.adapter.recorded_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_input_locked_until_greeting_settles() {
        let gated = GatedMockAdapter::new();
        gated.queue_reply(GREETING);
        let session = TestSession::start(gated, false);

        let view = session
            .wait_for(Duration::from_secs(2), |v| !v.state.is_idle())
            .await
            .unwrap();
        assert!(!view.input_enabled);

        session.handle.edit_input("early").await.unwrap();
        session.handle.submit("early").await.unwrap();
        session.adapter.release();

        let view = session.wait_settled(1).await;
        assert_eq!(view.input, "");
        assert_eq!(view.messages.len(), 1);

        session.handle.edit_input("Hej då").await.unwrap();
        let view = session
            .wait_for(Duration::from_secs(2), |v| v.input == "Hej då")
            .await;
        assert!(view.is_some());
    }

    #[tokio::test]
    async fn test_bubbles_mirror_and_expire() {
        let mock = MockAdapter::new();
        mock.queue_reply(GREETING);
        let session = TestSession::start(mock, true);

        let view = session.wait_settled(1).await;
        assert_eq!(view.bubbles.len(), 1);
        let bubble = &view.bubbles[0];
        let start = bubble.start_pos.unwrap();
        assert!((10.0..25.0).contains(&start));

        session.handle.bubble_finished(bubble.id).await.unwrap();
        let view = session
            .wait_for(Duration::from_secs(2), |v| v.bubbles.is_empty())
            .await
            .unwrap();
        // Leaving the bubble view never touches the log
        assert_eq!(view.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_no_bubbles_when_disabled() {
        let mock = MockAdapter::new();
        mock.queue_reply(GREETING);
        let session = TestSession::start(mock, false);

        let view = session.wait_settled(1).await;
        assert!(view.bubbles.is_empty());
        assert!(view.messages[0].start_pos.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_order_for_user_turn() {
        let mock = MockAdapter::new();
        mock.queue_reply(GREETING);
        mock.queue_reply("Svar");
        let session = TestSession::start(mock, false);
        session.wait_settled(1).await;

        let mut rx = session.handle.subscribe();
        session.handle.submit("Hej").await.unwrap();
        let events = collect_until_settled(&mut rx).await;

        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                SessionEvent::Message { .. } => "message",
                SessionEvent::StateChange { .. } => "state_change",
                SessionEvent::Input { .. } => "input",
                SessionEvent::BubbleRemoved { .. } => "bubble_removed",
                SessionEvent::TurnSettled => "turn_settled",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "message",
                "input",
                "state_change",
                "message",
                "state_change",
                "turn_settled",
            ]
        );
    }
}
