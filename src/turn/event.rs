//! Events that drive the turn controller

use crate::completion::CompletionError;
use crate::conversation::MessageId;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Session start; kicks off the greeting turn
    SessionStarted,

    // User events
    UserSubmit { text: String },
    InputEdited { text: String },

    // Completion events
    CompletionSucceeded { text: String },
    /// Backend answered but carried no usable text
    CompletionEmpty,
    CompletionFailed { error: CompletionError },

    /// A floating bubble finished its animation
    BubbleFinished { id: MessageId },
}
