//! ORDNING - single-user chat session
//!
//! A turn controller over an append-only conversation store, talking to a
//! completion backend through interchangeable adapters.

mod api;
mod completion;
mod config;
mod conversation;
mod session;
mod turn;

use api::{create_router, AppState};
use completion::build_adapter;
use config::AppConfig;
use conversation::ConversationStore;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turn::TurnContext;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ordning=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;
    let adapter = build_adapter(&config)?;

    tracing::info!(
        backend = config.backend.name(),
        bubbles = config.bubbles,
        timeout_secs = config.request_timeout.as_secs(),
        "Completion backend configured"
    );

    let store = if config.bubbles {
        ConversationStore::with_bubbles()
    } else {
        ConversationStore::new()
    };
    let session_id = uuid::Uuid::new_v4().to_string();
    let session = session::spawn_session(TurnContext::new(session_id, &config), store, adapter);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(AppState::new(session))
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("ORDNING listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
