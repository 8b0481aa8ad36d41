//! Template field states (WAITING_FOR_DESTINATION, WAITING_FOR_PRICE, ...)

use super::{Flow, StateHandler, WorkflowEnv};
use crate::templates::{validate_field, FieldSource, TemplateField, ValidationError};
use crate::workflow::{prompts, Context, Input, WorkflowError, WorkflowState};
use async_trait::async_trait;

/// Collects the template field prompted for in `state`
pub struct FieldHandler {
    state: WorkflowState,
}

impl FieldHandler {
    pub fn new(state: WorkflowState) -> Self {
        Self { state }
    }

    /// Definition of the field being collected, from the bound templates
    fn field(&self, env: &WorkflowEnv, ctx: &Context) -> Option<TemplateField> {
        let pending = ctx.pending_field.as_deref();
        let mut fallback = None;
        for platform in &ctx.selected_platforms {
            let Some(content_type) = ctx.content_type_for(platform) else {
                continue;
            };
            let Ok(template) = env.catalog.lookup(platform, content_type) else {
                continue;
            };
            if let Some(field) = template.field_for_state(self.state) {
                if pending.is_none_or(|p| p == field.name) {
                    return Some(field.clone());
                }
                fallback.get_or_insert_with(|| field.clone());
            }
        }
        fallback.or_else(|| {
            pending.map(|name| {
                TemplateField::new(name, FieldSource::UserInput).asked_in(self.state, "")
            })
        })
    }
}

#[async_trait]
impl StateHandler for FieldHandler {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError> {
        let mut ctx = env.store.get_context(user_id);
        let Some(field) = self.field(env, &ctx) else {
            tracing::warn!(user_id = %user_id, state = %self.state, "No template field for state, skipping to caption");
            ctx.pending_field = None;
            env.store.update_context(user_id, ctx);
            env.store.set_state(user_id, WorkflowState::CaptionInput);
            env.send_text(user_id, prompts::CAPTION_PROMPT).await?;
            return Ok(Flow::Done);
        };

        let value = if input.is_media() {
            Err(ValidationError::TextExpected {
                field: field.label(),
            })
        } else {
            validate_field(&field, &input.text)
        };
        let value = match value {
            Ok(value) => value,
            Err(e) => {
                tracing::info!(user_id = %user_id, field = %field.name, error = %e, "Field input rejected");
                env.send_text(user_id, &e.to_string()).await?;
                return Ok(Flow::Done);
            }
        };

        tracing::info!(user_id = %user_id, field = %field.name, "Collected template field");
        ctx.template_data.insert(field.name.clone(), value);
        ctx.pending_field = None;

        if let Some(request) = env.next_request(&ctx) {
            return env.ask_field(user_id, ctx, request).await;
        }

        let original_text = ctx.original_text.clone().filter(|t| !t.is_empty());
        env.store.update_context(user_id, ctx);
        env.store.set_state(user_id, WorkflowState::CaptionInput);
        match original_text {
            Some(text) => Ok(Flow::Continue(text)),
            None => {
                env.send_text(user_id, prompts::CAPTION_PROMPT).await?;
                Ok(Flow::Done)
            }
        }
    }
}
