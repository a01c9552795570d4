//! Completion adapters
//!
//! One capability, `complete`, with two interchangeable backends: the
//! webhook relay and a direct completion endpoint. The turn controller only
//! ever sees the trait.

mod direct;
mod error;
mod relay;
mod types;


pub use direct::DirectAdapter;
#[allow(unused_imports)] // Kind is matched on by callers and tests
pub use error::{CompletionError, CompletionErrorKind};
pub use relay::RelayAdapter;
#[allow(unused_imports)] // Public API re-exports
pub use types::{build_history, WireMessage, WireRole};

use crate::config::{AppConfig, Backend};
use crate::conversation::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion backends
#[async_trait]
pub trait CompletionAdapter: Send + Sync {
    /// Produce a reply to `user_text` given the conversation that preceded it.
    /// `Ok(None)` means the backend answered without usable text. Never retries.
    async fn complete(
        &self,
        conversation: &[Message],
        user_text: &str,
    ) -> Result<Option<String>, CompletionError>;

    /// Short strategy name for logs
    fn strategy(&self) -> &str;
}

#[async_trait]
impl<T: CompletionAdapter + ?Sized> CompletionAdapter for Arc<T> {
    async fn complete(
        &self,
        conversation: &[Message],
        user_text: &str,
    ) -> Result<Option<String>, CompletionError> {
        (**self).complete(conversation, user_text).await
    }

    fn strategy(&self) -> &str {
        (**self).strategy()
    }
}

/// Logging wrapper for completion adapters
pub struct LoggingAdapter {
    inner: Arc<dyn CompletionAdapter>,
    strategy: String,
}

impl LoggingAdapter {
    pub fn new(inner: Arc<dyn CompletionAdapter>) -> Self {
        let strategy = inner.strategy().to_string();
        Self { inner, strategy }
    }
}

#[async_trait]
impl CompletionAdapter for LoggingAdapter {
    async fn complete(
        &self,
        conversation: &[Message],
        user_text: &str,
    ) -> Result<Option<String>, CompletionError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(conversation, user_text).await;
        let duration = start.elapsed();

        match &result {
            Ok(Some(reply)) => {
                tracing::info!(
                    strategy = %self.strategy,
                    duration_ms = %duration.as_millis(),
                    history_len = conversation.len(),
                    reply_chars = reply.chars().count(),
                    "Completion succeeded"
                );
            }
            Ok(None) => {
                tracing::info!(
                    strategy = %self.strategy,
                    duration_ms = %duration.as_millis(),
                    history_len = conversation.len(),
                    "Completion returned no text"
                );
            }
            Err(e) => {
                tracing::error!(
                    strategy = %self.strategy,
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    status = ?e.status,
                    error = %e.message,
                    "Completion failed"
                );
            }
        }

        result
    }

    fn strategy(&self) -> &str {
        &self.strategy
    }
}

/// Build the configured adapter, wrapped with logging
pub fn build_adapter(config: &AppConfig) -> Result<Arc<dyn CompletionAdapter>, reqwest::Error> {
    let inner: Arc<dyn CompletionAdapter> = match &config.backend {
        Backend::Relay { url } => Arc::new(RelayAdapter::new(
            url,
            &config.system_directive,
            config.request_timeout,
        )?),
        Backend::Direct {
            url,
            api_key,
            model,
        } => Arc::new(DirectAdapter::new(
            url,
            api_key,
            model,
            &config.system_directive,
            config.request_timeout,
        )?),
    };
    Ok(Arc::new(LoggingAdapter::new(inner)))
}
