//! INIT: wait for a greeting

use super::{Flow, StateHandler, WorkflowEnv};
use crate::workflow::{prompts, Context, Input, WorkflowError, WorkflowState};
use async_trait::async_trait;

const GREETINGS: [&str; 5] = ["hi", "hello", "hey", "hola", "start"];

pub struct GreetingHandler;

#[async_trait]
impl StateHandler for GreetingHandler {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError> {
        let keyword = input.keyword();
        let word = keyword.trim_end_matches(['!', '.', ' ']);
        if !GREETINGS.contains(&word) {
            env.send_text(user_id, prompts::START_PROMPT).await?;
            return Ok(Flow::Done);
        }

        tracing::info!(user_id = %user_id, "Starting new post workflow");
        env.store.update_context(user_id, Context::default());
        env.store
            .set_state(user_id, WorkflowState::ContentTypeSelection);
        env.send_content_types(user_id, prompts::CONTENT_TYPE_SELECTION)
            .await?;
        Ok(Flow::Done)
    }
}
