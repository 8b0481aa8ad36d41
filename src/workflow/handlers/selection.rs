//! Content type and platform selection

use super::{Flow, StateHandler, WorkflowEnv};
use crate::templates::TemplateNotFound;
use crate::workflow::{prompts, Context, Input, WorkflowError, WorkflowState};
use async_trait::async_trait;

/// CONTENT_TYPE_SELECTION
pub struct ContentTypeHandler;

#[async_trait]
impl StateHandler for ContentTypeHandler {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError> {
        let content_type = input.keyword();
        if !env.catalog.has_content_type(&content_type) {
            env.send_content_types(user_id, prompts::INVALID_CONTENT_TYPE)
                .await?;
            return Ok(Flow::Done);
        }

        let mut ctx = env.store.get_context(user_id);
        ctx.selected_content_type = Some(content_type.clone());
        ctx.supported_platforms = env
            .catalog
            .platforms_for(&content_type)
            .into_iter()
            .map(String::from)
            .collect();
        ctx.selected_platforms.clear();
        ctx.content_types.clear();

        env.store.update_context(user_id, ctx.clone());
        env.store
            .set_state(user_id, WorkflowState::PlatformSelectionForContent);
        env.send_platforms(user_id, &ctx, &prompts::platform_selection(&content_type))
            .await?;
        Ok(Flow::Done)
    }
}

/// PLATFORM_SELECTION_FOR_CONTENT: accumulate platforms until "done" or "all"
pub struct PlatformHandler;

#[async_trait]
impl StateHandler for PlatformHandler {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError> {
        let mut ctx = env.store.get_context(user_id);
        let choice = input.keyword();

        match choice.as_str() {
            "all" | "all platforms" => {
                for platform in ctx.supported_platforms.clone() {
                    ctx.select_platform(&platform);
                }
                advance(env, user_id, ctx).await
            }
            "done" => {
                if ctx.selected_platforms.is_empty() {
                    env.send_platforms(user_id, &ctx, prompts::NO_PLATFORM_SELECTED)
                        .await?;
                    Ok(Flow::Done)
                } else {
                    advance(env, user_id, ctx).await
                }
            }
            platform if ctx.supported_platforms.iter().any(|p| p == platform) => {
                ctx.select_platform(platform);
                let all_selected = ctx
                    .supported_platforms
                    .iter()
                    .all(|p| ctx.selected_platforms.contains(p));
                if all_selected {
                    return advance(env, user_id, ctx).await;
                }
                env.store.update_context(user_id, ctx.clone());
                let body = prompts::platform_added(platform, &ctx.selected_platforms);
                env.send_platforms(user_id, &ctx, &body).await?;
                Ok(Flow::Done)
            }
            _ => {
                env.send_platforms(user_id, &ctx, prompts::INVALID_PLATFORM)
                    .await?;
                Ok(Flow::Done)
            }
        }
    }
}

/// Bind the template for the selection and move on to field collection or
/// caption input
async fn advance(env: &WorkflowEnv, user_id: &str, mut ctx: Context) -> Result<Flow, WorkflowError> {
    let content_type = ctx.selected_content_type.clone().unwrap_or_default();
    for platform in &ctx.selected_platforms {
        ctx.content_types
            .insert(platform.clone(), content_type.clone());
    }

    let primary = ctx.primary_platform().unwrap_or_default().to_string();
    match env.catalog.lookup(&primary, &content_type) {
        Ok(template) => {
            ctx.template_id = Some(env.catalog.template_id(&primary, &content_type));
            ctx.template_type = Some(content_type.clone());
            ctx.is_video_content = template.is_video;
        }
        Err(TemplateNotFound {
            platform,
            content_type,
        }) => {
            tracing::warn!(
                user_id = %user_id,
                platform = %platform,
                content_type = %content_type,
                "No template, continuing without one"
            );
            ctx.template_id = None;
            ctx.template_type = None;
        }
    }

    tracing::info!(
        user_id = %user_id,
        platforms = ?ctx.selected_platforms,
        content_type = %content_type,
        "Platforms selected"
    );

    if let Some(request) = env.next_request(&ctx) {
        return env.ask_field(user_id, ctx, request).await;
    }

    env.store.update_context(user_id, ctx);
    env.store.set_state(user_id, WorkflowState::CaptionInput);
    env.send_text(user_id, prompts::CAPTION_PROMPT).await?;
    Ok(Flow::Done)
}
