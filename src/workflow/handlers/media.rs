//! WAITING_FOR_MEDIA_UPLOAD, IMAGE_SELECTION and VIDEO_SELECTION

use super::{Flow, StateHandler, WorkflowEnv};
use crate::messaging::MediaKind;
use crate::workflow::{prompts, Input, WorkflowError, WorkflowState};
use async_trait::async_trait;

pub struct MediaHandler {
    state: WorkflowState,
}

impl MediaHandler {
    pub fn new(state: WorkflowState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl StateHandler for MediaHandler {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError> {
        let mut ctx = env.store.get_context(user_id);

        if let Some(media) = &input.media {
            return match env.accept_upload(user_id, &mut ctx, media).await {
                Ok(()) => env.go_to_schedule(user_id, ctx).await,
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Could not resolve uploaded media");
                    env.send_text(user_id, prompts::UPLOAD_FAILED).await?;
                    Ok(Flow::Done)
                }
            };
        }

        if self.state == WorkflowState::WaitingForMediaUpload {
            env.send_text(user_id, prompts::UPLOAD_EXPECTED).await?;
            return Ok(Flow::Done);
        }

        if input.keyword() == "upload" {
            env.store
                .set_state(user_id, WorkflowState::WaitingForMediaUpload);
            env.send_text(user_id, prompts::UPLOAD_PROMPT).await?;
            return Ok(Flow::Done);
        }

        let kind = if self.state == WorkflowState::VideoSelection {
            MediaKind::Video
        } else {
            MediaKind::Image
        };
        let candidates = ctx.candidates(kind);
        let Some(choice) = input.choice(candidates.len()) else {
            env.send_text(user_id, &prompts::invalid_choice(candidates.len()))
                .await?;
            return Ok(Flow::Done);
        };

        let url = candidates[choice - 1].clone();
        tracing::info!(user_id = %user_id, choice, kind = kind.as_str(), "Media selected");
        ctx.set_media(kind, url);
        env.go_to_schedule(user_id, ctx).await
    }
}
