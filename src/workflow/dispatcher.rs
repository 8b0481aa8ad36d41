//! Central state → handler table

use super::handlers::{
    CaptionHandler, ConfirmationHandler, ContentTypeHandler, ExecutionHandler, FieldHandler,
    GreetingHandler, MediaHandler, PlatformHandler, ScheduleHandler,
};
use super::{prompts, DispatchError, Flow, Input, StateHandler, WorkflowEnv, WorkflowError, WorkflowState};
use std::collections::HashMap;
use std::sync::Arc;

/// Handler invocations allowed in one turn (the longest real chain is
/// field → caption or confirmation → execution)
const MAX_HOPS: usize = 4;

const RESTART_COMMANDS: [&str; 3] = ["menu", "restart", "cancel"];

pub struct Dispatcher {
    env: WorkflowEnv,
    handlers: HashMap<WorkflowState, Arc<dyn StateHandler>>,
}

impl Dispatcher {
    pub fn new(env: WorkflowEnv) -> Self {
        Self::with_handlers(env, default_handlers())
    }

    pub fn with_handlers(
        env: WorkflowEnv,
        handlers: HashMap<WorkflowState, Arc<dyn StateHandler>>,
    ) -> Self {
        Self { env, handlers }
    }

    /// Process one inbound message for `user_id`.
    ///
    /// Unroutable states are recovered here by resetting the session; only
    /// messaging failures and runaway chains are returned.
    pub async fn dispatch(&self, user_id: &str, text: &str) -> Result<(), WorkflowError> {
        let mut input = Input::parse(text);

        if self.global_command(user_id, &input).await? {
            return Ok(());
        }

        for _ in 0..MAX_HOPS {
            let state = self.env.store.get_state(user_id);
            let Some(handler) = self.handlers.get(&state) else {
                self.recover(user_id, &DispatchError::UnknownState(state))
                    .await;
                return Ok(());
            };

            tracing::debug!(user_id = %user_id, state = %state, "Dispatching");
            match handler.handle(&self.env, user_id, &input).await? {
                Flow::Done => return Ok(()),
                Flow::Continue(next) => input = Input::parse(&next),
                Flow::Advance => input = Input::automatic(),
            }
        }

        Err(DispatchError::TooManyHops(MAX_HOPS).into())
    }

    /// `menu`/`restart`/`cancel` abort the workflow; `help` explains it
    async fn global_command(&self, user_id: &str, input: &Input) -> Result<bool, WorkflowError> {
        let keyword = input.keyword();
        if RESTART_COMMANDS.contains(&keyword.as_str()) {
            tracing::info!(user_id = %user_id, command = %keyword, "Workflow aborted by user");
            self.env.store.reset(user_id);
            let text = format!("{}\n\n{}", prompts::RESTARTED, prompts::START_PROMPT);
            self.env.send_text(user_id, &text).await?;
            return Ok(true);
        }
        if keyword == "help" {
            self.env.send_text(user_id, prompts::HELP).await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn recover(&self, user_id: &str, error: &DispatchError) {
        tracing::error!(user_id = %user_id, error = %error, "Resetting session");
        self.env.store.reset(user_id);
        if let Err(e) = self
            .env
            .send_text(user_id, prompts::SESSION_RECOVERED)
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Could not send recovery message");
        }
    }
}

fn default_handlers() -> HashMap<WorkflowState, Arc<dyn StateHandler>> {
    let mut handlers: HashMap<WorkflowState, Arc<dyn StateHandler>> = HashMap::new();
    handlers.insert(WorkflowState::Init, Arc::new(GreetingHandler));
    handlers.insert(WorkflowState::ContentTypeSelection, Arc::new(ContentTypeHandler));
    handlers.insert(WorkflowState::PlatformSelectionForContent, Arc::new(PlatformHandler));
    for state in WorkflowState::ALL.into_iter().filter(|s| s.is_field_state()) {
        handlers.insert(state, Arc::new(FieldHandler::new(state)));
    }
    handlers.insert(WorkflowState::CaptionInput, Arc::new(CaptionHandler));
    for state in [
        WorkflowState::WaitingForMediaUpload,
        WorkflowState::ImageSelection,
        WorkflowState::VideoSelection,
    ] {
        handlers.insert(state, Arc::new(MediaHandler::new(state)));
    }
    handlers.insert(WorkflowState::ScheduleSelection, Arc::new(ScheduleHandler));
    handlers.insert(WorkflowState::Confirmation, Arc::new(ConfirmationHandler));
    handlers.insert(WorkflowState::PostExecution, Arc::new(ExecutionHandler));
    handlers
}
