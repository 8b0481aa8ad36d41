//! Conversational workflow
//!
//! A tagged state per user, one handler per state, and a central dispatcher
//! that routes each turn to the handler for the user's current state.

mod context;
mod dispatcher;
mod error;
pub mod handlers;
mod input;
pub mod prompts;
mod state;

#[cfg(test)]
mod proptests;

pub use context::{Context, MediaMetadata};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, WorkflowError};
pub use handlers::{Collaborators, Flow, Settings, StateHandler, WorkflowEnv};
pub use input::Input;
pub use state::WorkflowState;
