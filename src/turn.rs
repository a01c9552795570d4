//! Turn controller state machine
//!
//! Pure transitions in the Elm style: `(state, event) -> (state, effects)`.
//! The session executes the effects; nothing in here does I/O.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{TurnContext, TurnKind, TurnState};
#[allow(unused_imports)] // Public API re-exports
pub use transition::{transition, TransitionError, TransitionResult};
