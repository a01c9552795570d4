//! Pure state transition function

use super::{Effect, Event, TurnContext, TurnKind, TurnState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Rejected events. A rejection leaves state and store untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Input is empty")]
    EmptyInput,
    #[error("A turn is already in flight")]
    Busy,
    #[error("Input is locked while awaiting a response")]
    InputLocked,
    #[error("Unexpected event: {0}")]
    Unexpected(String),
}

/// Pure state transition function
pub fn transition(
    state: &TurnState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (*state, event) {
        // Greeting turn runs once at session start, before any user input
        (TurnState::Idle, Event::SessionStarted) => Ok(TransitionResult::new(
            TurnState::AwaitingResponse {
                kind: TurnKind::Greeting,
            },
        )
        .with_effect(Effect::NotifyStateChange)
        .with_effect(Effect::RequestCompletion {
            kind: TurnKind::Greeting,
            user_text: context.greeting_directive.clone(),
        })),

        (TurnState::AwaitingResponse { .. }, Event::SessionStarted) => {
            Err(TransitionError::Unexpected("session already started".to_string()))
        }

        // Submissions
        (TurnState::AwaitingResponse { .. }, Event::UserSubmit { .. }) => {
            Err(TransitionError::Busy)
        }

        (TurnState::Idle, Event::UserSubmit { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyInput);
            }
            Ok(
                TransitionResult::new(TurnState::AwaitingResponse {
                    kind: TurnKind::User,
                })
                .with_effect(Effect::append_user(text.clone()))
                .with_effect(Effect::clear_input())
                .with_effect(Effect::NotifyStateChange)
                .with_effect(Effect::RequestCompletion {
                    kind: TurnKind::User,
                    user_text: text,
                }),
            )
        }

        // Input editing
        (TurnState::Idle, Event::InputEdited { text }) => {
            Ok(TransitionResult::new(TurnState::Idle).with_effect(Effect::SetInput { text }))
        }

        (TurnState::AwaitingResponse { .. }, Event::InputEdited { .. }) => {
            Err(TransitionError::InputLocked)
        }

        // Completion outcomes
        (TurnState::AwaitingResponse { .. }, Event::CompletionSucceeded { text }) => {
            Ok(TransitionResult::new(TurnState::Idle)
                .with_effect(Effect::append_ai(text))
                .with_effect(Effect::NotifyStateChange)
                .with_effect(Effect::NotifyTurnSettled))
        }

        // Not a failure, but shown the same way
        (TurnState::AwaitingResponse { kind }, Event::CompletionEmpty) => {
            Ok(TransitionResult::new(TurnState::Idle)
                .with_effect(Effect::append_ai(context.fallback_for(kind)))
                .with_effect(Effect::NotifyStateChange)
                .with_effect(Effect::NotifyTurnSettled))
        }

        (TurnState::AwaitingResponse { kind }, Event::CompletionFailed { error }) => {
            // The raw error is never shown to the user
            Ok(TransitionResult::new(TurnState::Idle)
                .with_effect(Effect::LogFailure { kind, error })
                .with_effect(Effect::append_ai(context.fallback_for(kind)))
                .with_effect(Effect::NotifyStateChange)
                .with_effect(Effect::NotifyTurnSettled))
        }

        (
            TurnState::Idle,
            Event::CompletionSucceeded { .. } | Event::CompletionEmpty | Event::CompletionFailed { .. },
        ) => {
            Err(TransitionError::Unexpected(
                "completion outcome while idle".to_string(),
            ))
        }

        // Bubble removal never changes controller state
        (state, Event::BubbleFinished { id }) => {
            Ok(TransitionResult::new(state).with_effect(Effect::RemoveBubble { id }))
        }
    }
}
