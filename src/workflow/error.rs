//! Turn-level errors
//!
//! Validation failures and collaborator failures are recovered inside the
//! handlers. What escapes a turn is either a routing problem or a failure to
//! talk to the user at all.

use super::WorkflowState;
use crate::messaging::MessagingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No handler registered for state {0}")]
    UnknownState(WorkflowState),
    #[error("Turn exceeded {0} chained handler invocations")]
    TooManyHops(usize),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Messaging(#[from] MessagingError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
