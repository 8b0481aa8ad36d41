//! Messaging channel abstraction
//!
//! Handlers talk to users only through [`Messenger`]. The WhatsApp Cloud API
//! adapter lives in [`whatsapp`]; webhook normalisation in [`inbound`].

pub mod inbound;
pub mod whatsapp;

pub use inbound::MediaRef;
pub use whatsapp::WhatsAppClient;

use crate::content::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Reply buttons allowed in a single interactive message
pub const MAX_REPLY_BUTTONS: usize = 3;

/// Label of the list button used when buttons overflow into a list
pub const LIST_FALLBACK_LABEL: &str = "Select an option";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// A single image or video to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub url: String,
    pub caption: Option<String>,
}

impl MediaItem {
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            caption: None,
        }
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// An interactive reply option; `id` comes back as the user's message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub id: String,
    pub title: String,
}

impl Button {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<Button>,
}

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Messaging request failed: {0}")]
    Transport(String),
    #[error("Messaging API rejected the message ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("Invalid outbound message: {0}")]
    InvalidMessage(String),
}

/// Outbound side of the messaging channel
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), MessagingError>;

    async fn send_media(&self, user_id: &str, items: &[MediaItem]) -> Result<(), MessagingError>;

    /// Send at most [`MAX_REPLY_BUTTONS`] reply buttons
    async fn send_reply_buttons(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<(), MessagingError>;

    async fn send_list(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        button_label: &str,
        sections: &[ListSection],
    ) -> Result<(), MessagingError>;

    /// Look up a downloadable URL for media the user uploaded
    async fn resolve_media(&self, media_id: &str) -> Result<String, ServiceError>;

    /// Send options as reply buttons, falling back to a single-section list
    /// when there are more than [`MAX_REPLY_BUTTONS`].
    async fn send_buttons(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<(), MessagingError> {
        if buttons.len() > MAX_REPLY_BUTTONS {
            let sections = [ListSection {
                title: "Options".to_string(),
                rows: buttons.to_vec(),
            }];
            self.send_list(user_id, header, body, LIST_FALLBACK_LABEL, &sections)
                .await
        } else {
            self.send_reply_buttons(user_id, header, body, buttons).await
        }
    }
}

/// Logging wrapper for messengers
pub struct LoggingMessenger {
    inner: Arc<dyn Messenger>,
}

impl LoggingMessenger {
    pub fn new(inner: Arc<dyn Messenger>) -> Self {
        Self { inner }
    }

    fn log<T>(user_id: &str, kind: &str, started: Instant, result: &Result<T, MessagingError>) {
        let duration_ms = started.elapsed().as_millis();
        match result {
            Ok(_) => tracing::debug!(user_id = %user_id, kind, duration_ms, "Message sent"),
            Err(e) => tracing::warn!(
                user_id = %user_id,
                kind,
                duration_ms,
                error = %e,
                "Message send failed"
            ),
        }
    }
}

#[async_trait]
impl Messenger for LoggingMessenger {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), MessagingError> {
        let started = Instant::now();
        let result = self.inner.send_text(user_id, text).await;
        Self::log(user_id, "text", started, &result);
        result
    }

    async fn send_media(&self, user_id: &str, items: &[MediaItem]) -> Result<(), MessagingError> {
        let started = Instant::now();
        let result = self.inner.send_media(user_id, items).await;
        Self::log(user_id, "media", started, &result);
        result
    }

    async fn send_reply_buttons(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<(), MessagingError> {
        let started = Instant::now();
        let result = self
            .inner
            .send_reply_buttons(user_id, header, body, buttons)
            .await;
        Self::log(user_id, "buttons", started, &result);
        result
    }

    async fn send_list(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        button_label: &str,
        sections: &[ListSection],
    ) -> Result<(), MessagingError> {
        let started = Instant::now();
        let result = self
            .inner
            .send_list(user_id, header, body, button_label, sections)
            .await;
        Self::log(user_id, "list", started, &result);
        result
    }

    async fn resolve_media(&self, media_id: &str) -> Result<String, ServiceError> {
        let result = self.inner.resolve_media(media_id).await;
        if let Err(e) = &result {
            tracing::warn!(media_id = %media_id, error = %e, "Media lookup failed");
        }
        result
    }
}
