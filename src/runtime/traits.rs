//! Trait abstraction for turn execution
//!
//! Lets workers be tested with scripted runners instead of the full
//! dispatcher.

use crate::workflow::{Dispatcher, WorkflowError};
use async_trait::async_trait;
use std::sync::Arc;

/// Runs one turn (one inbound message) for a user
#[async_trait]
pub trait TurnRunner: Send + Sync {
    async fn run_turn(&self, user_id: &str, text: &str) -> Result<(), WorkflowError>;
}

#[async_trait]
impl TurnRunner for Dispatcher {
    async fn run_turn(&self, user_id: &str, text: &str) -> Result<(), WorkflowError> {
        self.dispatch(user_id, text).await
    }
}

#[async_trait]
impl<T: TurnRunner + ?Sized> TurnRunner for Arc<T> {
    async fn run_turn(&self, user_id: &str, text: &str) -> Result<(), WorkflowError> {
        (**self).run_turn(user_id, text).await
    }
}
