//! Server-Sent Events support

use crate::session::{SessionEvent, SessionView};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Stream the current view as `init`, then live session events
pub fn sse_stream(
    view_rx: watch::Receiver<SessionView>,
    broadcast_rx: broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events =
        session_stream(view_rx, broadcast_rx).map(|(name, data)| Ok(to_axum(name, &data)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Named payloads for one client. A client that falls behind the broadcast
/// buffer gets a fresh `init` in place of the events it missed.
pub fn session_stream(
    view_rx: watch::Receiver<SessionView>,
    broadcast_rx: broadcast::Receiver<SessionEvent>,
) -> impl Stream<Item = (&'static str, Value)> {
    let initial = init_payload(&view_rx.borrow());
    let init = futures::stream::once(async move { ("init", initial) });

    let broadcasts = BroadcastStream::new(broadcast_rx).map(move |result| match result {
        Ok(event) => event_payload(&event),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "SSE client lagged, resending init");
            ("init", init_payload(&view_rx.borrow()))
        }
    });

    init.chain(broadcasts)
}

fn init_payload(view: &SessionView) -> Value {
    json!({ "type": "init", "session": view })
}

/// SSE event name and JSON body for a session event
pub fn event_payload(event: &SessionEvent) -> (&'static str, Value) {
    match event {
        SessionEvent::Message { message } => (
            "message",
            json!({ "type": "message", "message": message }),
        ),
        SessionEvent::StateChange {
            state,
            input_enabled,
        } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state,
                "input_enabled": input_enabled
            }),
        ),
        SessionEvent::Input { text } => ("input", json!({ "type": "input", "text": text })),
        SessionEvent::BubbleRemoved { id } => (
            "bubble_removed",
            json!({ "type": "bubble_removed", "id": id }),
        ),
        SessionEvent::TurnSettled => ("turn_settled", json!({ "type": "turn_settled" })),
    }
}

fn to_axum(name: &'static str, data: &Value) -> Event {
    Event::default().event(name).data(data.to_string())
}
