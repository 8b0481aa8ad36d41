//! CAPTION_INPUT: generate the caption, then find media

use super::{Flow, StateHandler, WorkflowEnv};
use crate::content::default_caption;
use crate::messaging::{MediaItem, MediaKind};
use crate::templates::prepare_template_data;
use crate::workflow::{prompts, Context, Input, WorkflowError, WorkflowState};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Fields that make a good fallback search query, in preference order
const QUERY_FIELDS: [&str; 4] = ["destination_name", "event_name", "headline", "seasonal_details"];

pub struct CaptionHandler;

#[async_trait]
impl StateHandler for CaptionHandler {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError> {
        let mut ctx = env.store.get_context(user_id);

        if let Some(media) = &input.media {
            return match env.accept_upload(user_id, &mut ctx, media).await {
                Ok(()) => {
                    env.store.update_context(user_id, ctx);
                    let text = format!("{}\n\n{}", prompts::MEDIA_RECEIVED, prompts::CAPTION_PROMPT);
                    env.send_text(user_id, &text).await?;
                    Ok(Flow::Done)
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Could not resolve uploaded media");
                    env.send_text(user_id, prompts::UPLOAD_FAILED).await?;
                    Ok(Flow::Done)
                }
            };
        }

        if input.is_empty() {
            env.send_text(user_id, prompts::CAPTION_PROMPT).await?;
            return Ok(Flow::Done);
        }

        ctx.original_text = Some(input.text.clone());
        if let Some(request) = env.next_request(&ctx) {
            return env.ask_field(user_id, ctx, request).await;
        }

        env.send_text(user_id, prompts::GENERATING).await?;

        let fields = generation_fields(env, &ctx, &input.text);
        let caption = generate_caption(env, user_id, &ctx, &fields, &input.text).await;
        ctx.caption = Some(caption.clone());
        env.send_text(user_id, &prompts::caption_ready(&caption))
            .await?;

        if ctx.has_media() {
            return env.go_to_schedule(user_id, ctx).await;
        }

        let query = search_query(env, user_id, &ctx, &fields, &caption).await;
        let kind = if ctx.is_video_content {
            MediaKind::Video
        } else {
            MediaKind::Image
        };
        let limit = env.settings.media_candidates;
        let media = &env.collaborators.media;
        let search = match kind {
            MediaKind::Image => env.call("media_search", media.search_images(&query, limit)).await,
            MediaKind::Video => env.call("media_search", media.search_videos(&query, limit)).await,
        };
        let mut candidates = search.unwrap_or_else(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "Media search failed");
            Vec::new()
        });
        candidates.truncate(limit);
        tracing::info!(user_id = %user_id, query = %query, count = candidates.len(), "Media candidates found");

        match kind {
            MediaKind::Image => ctx.image_urls.clone_from(&candidates),
            MediaKind::Video => ctx.video_urls.clone_from(&candidates),
        }

        if candidates.is_empty() {
            env.store.update_context(user_id, ctx);
            env.store
                .set_state(user_id, WorkflowState::WaitingForMediaUpload);
            env.send_text(user_id, prompts::UPLOAD_PROMPT).await?;
            return Ok(Flow::Done);
        }

        let (state, intro) = match kind {
            MediaKind::Image => (WorkflowState::ImageSelection, prompts::IMAGE_GALLERY),
            MediaKind::Video => (WorkflowState::VideoSelection, prompts::VIDEO_GALLERY),
        };
        env.store.update_context(user_id, ctx);
        env.store.set_state(user_id, state);

        let items: Vec<MediaItem> = candidates
            .iter()
            .enumerate()
            .map(|(i, url)| MediaItem::new(kind, url.as_str()).with_caption(prompts::gallery_item(i + 1)))
            .collect();
        env.send_text(user_id, intro).await?;
        env.messenger().send_media(user_id, &items).await?;
        Ok(Flow::Done)
    }
}

/// Template values plus the user's own text, as generator input
fn generation_fields(env: &WorkflowEnv, ctx: &Context, text: &str) -> BTreeMap<String, String> {
    let mut fields = ctx
        .primary_platform()
        .and_then(|p| {
            let content_type = ctx.content_type_for(p)?;
            env.catalog.lookup(p, content_type).ok()
        })
        .map(|template| prepare_template_data(template, ctx))
        .unwrap_or_default();
    fields.extend(ctx.template_data.clone());
    fields.insert("user_text".to_string(), text.to_string());
    fields
}

async fn generate_caption(
    env: &WorkflowEnv,
    user_id: &str,
    ctx: &Context,
    fields: &BTreeMap<String, String>,
    text: &str,
) -> String {
    let generator = &env.collaborators.generator;
    let result = match ctx.template_type.as_deref() {
        Some(template_type) => {
            env.call(
                "generator",
                generator.generate_template_caption(template_type, fields),
            )
            .await
        }
        None => env.call("generator", generator.generate_caption(text)).await,
    };
    result.unwrap_or_else(|e| {
        tracing::warn!(user_id = %user_id, error = %e, "Caption generation failed, using default");
        default_caption(text)
    })
}

async fn search_query(
    env: &WorkflowEnv,
    user_id: &str,
    ctx: &Context,
    fields: &BTreeMap<String, String>,
    caption: &str,
) -> String {
    let template_type = ctx.template_type.as_deref().unwrap_or("post");
    let mut query_fields = fields.clone();
    query_fields.insert("caption".to_string(), caption.to_string());
    let generated = env
        .call(
            "generator",
            env.collaborators
                .generator
                .generate_search_query(template_type, &query_fields),
        )
        .await;
    match generated {
        Ok(query) if !query.trim().is_empty() => query,
        Ok(_) => fallback_query(ctx),
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Search query generation failed");
            fallback_query(ctx)
        }
    }
}

/// A query built from collected fields, or the first words of the user's text
fn fallback_query(ctx: &Context) -> String {
    QUERY_FIELDS
        .iter()
        .find_map(|f| ctx.template_data.get(*f))
        .cloned()
        .or_else(|| {
            ctx.original_text
                .as_deref()
                .map(|t| t.split_whitespace().take(5).collect::<Vec<_>>().join(" "))
        })
        .or_else(|| ctx.selected_content_type.clone())
        .unwrap_or_else(|| "social media".to_string())
}
