//! State handlers
//!
//! One handler per workflow state. A handler reads the session, validates the
//! input, calls collaborators, writes the context back, sets the next state
//! and sends the outbound messages for the turn. Validation failures and
//! collaborator failures are recovered here; only messaging failures escape.

mod caption;
mod execution;
mod fields;
mod greeting;
mod media;
mod schedule;
mod selection;

pub use caption::CaptionHandler;
pub use execution::{ConfirmationHandler, ExecutionHandler};
pub use fields::FieldHandler;
pub use greeting::GreetingHandler;
pub use media::MediaHandler;
pub use schedule::{ScheduleHandler, ScheduleSlot};
pub use selection::{ContentTypeHandler, PlatformHandler};

use super::{Context, Input, WorkflowError, WorkflowState};
use crate::content::{ContentGenerator, MediaSearch, Publisher, Renderer, ServiceError};
use crate::messaging::{Button, MediaKind, MediaRef, Messenger};
use crate::session::SessionStore;
use crate::templates::{
    content_type_title, next_field, platform_title, FieldRequest, TemplateCatalog,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// What the dispatcher should do after a handler returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Turn complete
    Done,
    /// Run the handler of the (new) current state with this text
    Continue(String),
    /// Run the handler of the (new) current state with no user input
    Advance,
}

#[async_trait]
pub trait StateHandler: Send + Sync {
    async fn handle(
        &self,
        env: &WorkflowEnv,
        user_id: &str,
        input: &Input,
    ) -> Result<Flow, WorkflowError>;
}

/// External collaborators handlers may call
#[derive(Clone)]
pub struct Collaborators {
    pub messenger: Arc<dyn Messenger>,
    pub generator: Arc<dyn ContentGenerator>,
    pub media: Arc<dyn MediaSearch>,
    pub renderer: Arc<dyn Renderer>,
    pub publisher: Arc<dyn Publisher>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Upper bound on any single collaborator call
    pub collaborator_timeout: Duration,
    /// Candidate images or videos offered after a search
    pub media_candidates: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collaborator_timeout: Duration::from_secs(30),
            media_candidates: 4,
        }
    }
}

/// Everything a handler needs, shared by all turns
pub struct WorkflowEnv {
    pub store: Arc<dyn SessionStore>,
    pub catalog: Arc<TemplateCatalog>,
    pub collaborators: Collaborators,
    pub settings: Settings,
}

impl WorkflowEnv {
    pub fn messenger(&self) -> &dyn Messenger {
        self.collaborators.messenger.as_ref()
    }

    /// Run a collaborator call under the configured timeout
    pub async fn call<T, F>(&self, service: &'static str, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>> + Send,
    {
        let limit = self.settings.collaborator_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(ServiceError::timeout(service, limit)))
    }

    pub async fn send_text(&self, user_id: &str, text: &str) -> Result<(), WorkflowError> {
        Ok(self.messenger().send_text(user_id, text).await?)
    }

    pub async fn send_buttons(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<(), WorkflowError> {
        Ok(self
            .messenger()
            .send_buttons(user_id, header, body, buttons)
            .await?)
    }

    /// Content type options, with `body` as the message text
    pub async fn send_content_types(&self, user_id: &str, body: &str) -> Result<(), WorkflowError> {
        let buttons: Vec<Button> = self
            .catalog
            .content_types()
            .into_iter()
            .map(|ct| Button::new(ct, content_type_title(ct)))
            .collect();
        self.send_buttons(user_id, "Content Type Selection", body, &buttons)
            .await
    }

    /// Platform options still available for the selected content type
    pub async fn send_platforms(
        &self,
        user_id: &str,
        ctx: &Context,
        body: &str,
    ) -> Result<(), WorkflowError> {
        let remaining: Vec<&String> = ctx
            .supported_platforms
            .iter()
            .filter(|p| !ctx.selected_platforms.contains(p))
            .collect();
        let mut buttons: Vec<Button> = remaining
            .iter()
            .map(|p| Button::new(p.as_str(), platform_title(p)))
            .collect();
        if remaining.len() > 1 && ctx.selected_platforms.is_empty() {
            buttons.push(Button::new("all", "All Platforms"));
        }
        buttons.push(Button::new("done", "Done"));
        let header = format!(
            "Platforms for {}",
            content_type_title(ctx.selected_content_type.as_deref().unwrap_or_default())
        );
        self.send_buttons(user_id, &header, body, &buttons).await
    }

    pub async fn send_schedule_options(&self, user_id: &str, body: &str) -> Result<(), WorkflowError> {
        let buttons: Vec<Button> = ScheduleSlot::ALL
            .iter()
            .map(|slot| Button::new(slot.id(), slot.title()))
            .collect();
        self.send_buttons(user_id, "Schedule Selection", body, &buttons)
            .await
    }

    /// First template field still needed from the user across the
    /// selected platforms
    pub fn next_request(&self, ctx: &Context) -> Option<FieldRequest> {
        ctx.selected_platforms.iter().find_map(|platform| {
            let content_type = ctx.content_type_for(platform)?;
            let template = self.catalog.lookup(platform, content_type).ok()?;
            next_field(template, ctx)
        })
    }

    /// Move to the state collecting `request` and ask for it
    pub async fn ask_field(
        &self,
        user_id: &str,
        mut ctx: Context,
        request: FieldRequest,
    ) -> Result<Flow, WorkflowError> {
        tracing::info!(user_id = %user_id, field = %request.field, state = %request.state, "Requesting template field");
        ctx.pending_field = Some(request.field);
        self.store.update_context(user_id, ctx);
        self.store.set_state(user_id, request.state);
        self.send_text(user_id, &request.prompt).await?;
        Ok(Flow::Done)
    }

    /// Store an uploaded photo or video as the post media
    pub async fn accept_upload(
        &self,
        user_id: &str,
        ctx: &mut Context,
        media: &MediaRef,
    ) -> Result<(), ServiceError> {
        let url = self
            .call(
                "whatsapp",
                self.collaborators.messenger.resolve_media(&media.media_id),
            )
            .await?;
        tracing::info!(user_id = %user_id, kind = media.kind.as_str(), "Stored uploaded media");
        ctx.set_media(media.kind, url.clone());
        ctx.is_video_content = media.kind == MediaKind::Video;
        ctx.media_metadata.insert(
            media.media_id.clone(),
            super::MediaMetadata {
                media_id: media.media_id.clone(),
                kind: media.kind,
                url,
            },
        );
        Ok(())
    }

    /// Save the context, move to schedule selection and offer the options
    pub async fn go_to_schedule(&self, user_id: &str, ctx: Context) -> Result<Flow, WorkflowError> {
        self.store.update_context(user_id, ctx);
        self.store.set_state(user_id, WorkflowState::ScheduleSelection);
        self.send_schedule_options(user_id, super::prompts::SCHEDULE_PROMPT)
            .await?;
        Ok(Flow::Done)
    }
}
