//! CONFIRMATION and POST_EXECUTION

use super::{Flow, StateHandler, WorkflowEnv};
use crate::content::PostDraft;
use crate::messaging::{MediaItem, MediaKind};
use crate::templates::prepare_template_data;
use crate::workflow::{prompts, Context, Input, WorkflowError, WorkflowState};
use async_trait::async_trait;

/// CONFIRMATION: yes publishes, no starts over
pub struct ConfirmationHandler;

#[async_trait]
impl StateHandler for ConfirmationHandler {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError> {
        match input.keyword().as_str() {
            "yes" | "y" | "yes, post it" | "post" => {
                tracing::info!(user_id = %user_id, "Post confirmed");
                env.store.set_state(user_id, WorkflowState::PostExecution);
                Ok(Flow::Advance)
            }
            "no" | "n" | "no, start over" => {
                tracing::info!(user_id = %user_id, "Post declined, resetting");
                env.store.reset(user_id);
                env.send_text(user_id, prompts::START_OVER).await?;
                Ok(Flow::Done)
            }
            _ => {
                env.send_text(user_id, prompts::YES_OR_NO).await?;
                let ctx = env.store.get_context(user_id);
                super::schedule::send_confirmation(env, user_id, &ctx).await?;
                Ok(Flow::Done)
            }
        }
    }
}

/// POST_EXECUTION: render and publish per platform, then always reset.
///
/// Entered only by the automatic hop from confirmation. A user message that
/// finds the session here means an earlier execution never finished; the
/// session is reset rather than publishing twice.
pub struct ExecutionHandler;

#[async_trait]
impl StateHandler for ExecutionHandler {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError> {
        if !input.automatic {
            tracing::warn!(user_id = %user_id, "Message arrived for an unfinished execution, resetting");
            env.store.reset(user_id);
            env.send_text(user_id, prompts::START_PROMPT).await?;
            return Ok(Flow::Done);
        }

        let mut ctx = env.store.get_context(user_id);
        if ctx.has_media() {
            env.send_text(user_id, prompts::EDITING).await?;
        }

        let mut previews = Vec::new();
        for platform in ctx.selected_platforms.clone() {
            let media = render_for(env, user_id, &mut ctx, &platform).await;
            if let Some((kind, url)) = &media {
                if ctx.platform_media.contains_key(&platform) {
                    previews.push(
                        MediaItem::new(*kind, url.as_str())
                            .with_caption(crate::templates::platform_title(&platform)),
                    );
                }
            }
            let draft = PostDraft {
                caption: ctx.caption_for(&platform).to_string(),
                media_kind: media.as_ref().map(|(kind, _)| *kind),
                media_url: media.map(|(_, url)| url),
                schedule: ctx.schedule_time.clone(),
            };
            let published = env
                .call(
                    "publisher",
                    env.collaborators.publisher.publish(&platform, &draft),
                )
                .await;
            let ok = match published {
                Ok(receipt) => {
                    tracing::info!(user_id = %user_id, platform = %platform, receipt = %receipt, "Published");
                    true
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, platform = %platform, error = %e, "Publishing failed");
                    false
                }
            };
            ctx.post_status.insert(platform, ok);
        }

        let (succeeded, failed): (Vec<String>, Vec<String>) = ctx
            .selected_platforms
            .iter()
            .cloned()
            .partition(|p| ctx.post_status.get(p) == Some(&true));
        tracing::info!(
            user_id = %user_id,
            succeeded = ?succeeded,
            failed = ?failed,
            "Post execution finished"
        );

        env.store.reset(user_id);

        if !previews.is_empty() {
            env.messenger().send_media(user_id, &previews).await?;
        }
        let report = if failed.is_empty() && !succeeded.is_empty() {
            prompts::post_success(&succeeded)
        } else if succeeded.is_empty() {
            prompts::POST_FAILURE.to_string()
        } else {
            prompts::post_partial(&succeeded, &failed)
        };
        env.send_text(user_id, &report).await?;
        env.send_text(user_id, prompts::CLOSING).await?;
        Ok(Flow::Done)
    }
}

/// Render the platform asset, falling back to the selected media
async fn render_for(
    env: &WorkflowEnv,
    user_id: &str,
    ctx: &mut Context,
    platform: &str,
) -> Option<(MediaKind, String)> {
    let (kind, selected) = ctx
        .selected_media()
        .map(|(kind, url)| (kind, url.to_string()))?;

    let Some(content_type) = ctx.content_type_for(platform).map(str::to_string) else {
        return Some((kind, selected));
    };
    let template = match env.catalog.lookup(platform, &content_type) {
        Ok(template) => template,
        Err(e) => {
            tracing::info!(user_id = %user_id, error = %e, "Publishing selected media as-is");
            return Some((kind, selected));
        }
    };
    let template_id = env.catalog.template_id(platform, &content_type);
    let data = prepare_template_data(template, ctx);
    match env
        .call("renderer", env.collaborators.renderer.render(&template_id, &data))
        .await
    {
        // Video templates render to a video, image templates to an image
        Ok(url) => {
            ctx.platform_media.insert(platform.to_string(), url.clone());
            Some((kind, url))
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, platform, error = %e, "Render failed, using selected media");
            Some((kind, selected))
        }
    }
}
