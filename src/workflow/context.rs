//! Per-user workflow context
//!
//! Everything a session accumulates across turns lives here as typed,
//! optional fields. An empty context is exactly `Context::default()`.

use crate::messaging::MediaKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata about a photo or video the user uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub media_id: String,
    pub kind: MediaKind,
    pub url: String,
}

/// Mutable record of everything collected so far for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    // Content selection
    pub selected_content_type: Option<String>,
    /// Ordered set: insertion order is preserved, duplicates are rejected
    pub selected_platforms: Vec<String>,
    pub content_types: BTreeMap<String, String>,
    pub supported_platforms: Vec<String>,

    // Authored content
    pub caption: Option<String>,
    pub original_text: Option<String>,
    pub platform_specific_captions: BTreeMap<String, String>,

    // Media
    pub selected_image: Option<String>,
    pub selected_video: Option<String>,
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,
    pub is_video_content: bool,

    // Template binding
    pub template_id: Option<String>,
    pub template_type: Option<String>,
    pub template_data: BTreeMap<String, String>,
    pub media_metadata: BTreeMap<String, MediaMetadata>,
    /// Template field the current prompt is asking for
    pub pending_field: Option<String>,

    // Scheduling and execution
    pub schedule_time: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub post_status: BTreeMap<String, bool>,
    /// Rendered asset per platform
    pub platform_media: BTreeMap<String, String>,
    pub current_platform_index: usize,
}

impl Context {
    pub fn is_empty(&self) -> bool {
        *self == Context::default()
    }

    /// Add a platform to the selection. Returns false if it was already selected.
    pub fn select_platform(&mut self, platform: &str) -> bool {
        if self.selected_platforms.iter().any(|p| p == platform) {
            return false;
        }
        self.selected_platforms.push(platform.to_string());
        true
    }

    pub fn primary_platform(&self) -> Option<&str> {
        self.selected_platforms.first().map(String::as_str)
    }

    /// Content type chosen for `platform`, falling back to the global selection
    pub fn content_type_for(&self, platform: &str) -> Option<&str> {
        self.content_types
            .get(platform)
            .map(String::as_str)
            .or(self.selected_content_type.as_deref())
    }

    /// Typed lookup of a context attribute by template field name.
    ///
    /// Only non-empty values count as present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        let value = match name {
            "caption" | "caption_text" => self.caption.as_deref(),
            "original_text" => self.original_text.as_deref(),
            "selected_content_type" => self.selected_content_type.as_deref(),
            "main_image" | "event_image" | "selected_image" => self.selected_image.as_deref(),
            "video_background" | "selected_video" => self.selected_video.as_deref(),
            "schedule_time" => self.schedule_time.as_deref(),
            "template_id" => self.template_id.as_deref(),
            "template_type" => self.template_type.as_deref(),
            _ => None,
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Whether a template field already has a value, either collected into
    /// `template_data` or exposed by a context attribute of the same name.
    pub fn has_field(&self, name: &str) -> bool {
        self.template_data
            .get(name)
            .is_some_and(|v| !v.trim().is_empty())
            || self.attribute(name).is_some()
    }

    /// The media the post will be published with
    pub fn selected_media(&self) -> Option<(MediaKind, &str)> {
        if self.is_video_content {
            if let Some(video) = self.selected_video.as_deref() {
                return Some((MediaKind::Video, video));
            }
        }
        self.selected_image
            .as_deref()
            .map(|image| (MediaKind::Image, image))
            .or_else(|| {
                self.selected_video
                    .as_deref()
                    .map(|video| (MediaKind::Video, video))
            })
    }

    pub fn has_media(&self) -> bool {
        self.selected_media().is_some()
    }

    /// Candidate URLs of `kind` from the last media search
    pub fn candidates(&self, kind: MediaKind) -> &[String] {
        match kind {
            MediaKind::Image => &self.image_urls,
            MediaKind::Video => &self.video_urls,
        }
    }

    /// Store the chosen or uploaded media in the slot matching its kind
    pub fn set_media(&mut self, kind: MediaKind, url: impl Into<String>) {
        match kind {
            MediaKind::Image => self.selected_image = Some(url.into()),
            MediaKind::Video => self.selected_video = Some(url.into()),
        }
    }

    /// Caption for a platform, preferring a platform-specific variant
    pub fn caption_for(&self, platform: &str) -> &str {
        self.platform_specific_captions
            .get(platform)
            .map(String::as_str)
            .or(self.caption.as_deref())
            .unwrap_or_default()
    }
}
