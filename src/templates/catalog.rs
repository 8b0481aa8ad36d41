//! Built-in template catalog

use super::{FieldSource, Template, TemplateField, TemplateNotFound};
use crate::workflow::WorkflowState;

const DESTINATION_PROMPT: &str =
    "Where is this trip going? Send the destination name (up to 5 words).";
const PRICE_PROMPT: &str = "What's the price? For example: From $499";
const EVENT_PROMPT: &str = "What's the name of the event? (up to 5 words)";
const HEADLINE_PROMPT: &str = "Send a short headline for the promotion (up to 8 words).";
const TIP_PROMPT: &str = "What tip would you like to share? Describe it in a sentence or two.";
const SEASONAL_PROMPT: &str = "Tell me about the seasonal theme or offer you want to feature.";

/// Immutable (platform, content type) → template lookup
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
    client_id: String,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<Template>, client_id: impl Into<String>) -> Self {
        Self {
            templates,
            client_id: client_id.into(),
        }
    }

    /// The shipped catalog for Instagram, LinkedIn and TikTok
    pub fn builtin(client_id: impl Into<String>) -> Self {
        let mut templates = Vec::new();
        for content_type in ["events", "destination", "promo", "tips", "seasonal"] {
            templates.push(image_template("instagram", content_type));
        }
        for content_type in ["events", "tips", "seasonal"] {
            let mut template = image_template("linkedin", content_type);
            template.fields.push(
                TemplateField::new("hashtags", FieldSource::Derived).depends_on(&["caption_text"]),
            );
            templates.push(template);
        }
        for content_type in ["generic", "promo"] {
            templates.push(video_template("tiktok", content_type));
        }
        Self::new(templates, client_id)
    }

    pub fn lookup(&self, platform: &str, content_type: &str) -> Result<&Template, TemplateNotFound> {
        self.templates
            .iter()
            .find(|t| t.platform == platform && t.content_type == content_type)
            .ok_or_else(|| TemplateNotFound {
                platform: platform.to_string(),
                content_type: content_type.to_string(),
            })
    }

    /// Field names for a template; empty when no template matches
    pub fn required_fields(&self, platform: &str, content_type: &str) -> Vec<&str> {
        self.lookup(platform, content_type)
            .map(Template::field_names)
            .unwrap_or_default()
    }

    /// Every content type, in first-seen order
    pub fn content_types(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for template in &self.templates {
            if !seen.contains(&template.content_type.as_str()) {
                seen.push(&template.content_type);
            }
        }
        seen
    }

    pub fn has_content_type(&self, content_type: &str) -> bool {
        self.templates.iter().any(|t| t.content_type == content_type)
    }

    /// Platforms offering a content type, in catalog order
    pub fn platforms_for(&self, content_type: &str) -> Vec<&str> {
        let mut platforms: Vec<&str> = Vec::new();
        for template in self.templates.iter().filter(|t| t.content_type == content_type) {
            if !platforms.contains(&template.platform.as_str()) {
                platforms.push(&template.platform);
            }
        }
        platforms
    }

    /// Render template identifier: `{platform}_{client_id}_{content_type}`
    pub fn template_id(&self, platform: &str, content_type: &str) -> String {
        format!(
            "{}_{}_{}",
            platform.to_lowercase(),
            self.client_id,
            content_type.to_lowercase()
        )
    }
}

pub fn platform_title(platform: &str) -> String {
    match platform {
        "linkedin" => "LinkedIn".to_string(),
        "tiktok" => "TikTok".to_string(),
        other => capitalize(other),
    }
}

pub fn content_type_title(content_type: &str) -> String {
    capitalize(content_type)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn caption_field() -> TemplateField {
    TemplateField::new("caption_text", FieldSource::AiGenerated)
}

/// Content-specific fields shared by image and video templates
fn detail_fields(content_type: &str) -> Vec<TemplateField> {
    match content_type {
        "destination" => vec![
            TemplateField::new("destination_name", FieldSource::UserInput)
                .asked_in(WorkflowState::WaitingForDestination, DESTINATION_PROMPT)
                .max_words(5),
            TemplateField::new("price_text", FieldSource::UserInput)
                .asked_in(WorkflowState::WaitingForPrice, PRICE_PROMPT),
        ],
        "events" => vec![TemplateField::new("event_name", FieldSource::UserInput)
            .asked_in(WorkflowState::WaitingForEventName, EVENT_PROMPT)
            .max_words(5)],
        "promo" => vec![
            TemplateField::new("headline", FieldSource::UserInput)
                .asked_in(WorkflowState::WaitingForHeadline, HEADLINE_PROMPT)
                .max_words(8),
            TemplateField::new("price_text", FieldSource::UserInput)
                .asked_in(WorkflowState::WaitingForPrice, PRICE_PROMPT),
        ],
        "tips" => vec![TemplateField::new("tip_details", FieldSource::AiGenerated)
            .asked_in(WorkflowState::WaitingForTipDetails, TIP_PROMPT)],
        "seasonal" => vec![TemplateField::new("seasonal_details", FieldSource::AiGenerated)
            .asked_in(WorkflowState::WaitingForSeasonalDetails, SEASONAL_PROMPT)],
        _ => Vec::new(),
    }
}

fn image_template(platform: &str, content_type: &str) -> Template {
    let media_field = if content_type == "events" {
        "event_image"
    } else {
        "main_image"
    };
    let mut fields = detail_fields(content_type);
    fields.push(caption_field());
    fields.push(TemplateField::new(media_field, FieldSource::ExternalService));
    Template {
        platform: platform.to_string(),
        content_type: content_type.to_string(),
        fields,
        is_video: false,
    }
}

fn video_template(platform: &str, content_type: &str) -> Template {
    let mut fields = detail_fields(content_type);
    fields.push(caption_field());
    fields.push(TemplateField::new(
        "video_background",
        FieldSource::ExternalService,
    ));
    Template {
        platform: platform.to_string(),
        content_type: content_type.to_string(),
        fields,
        is_video: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown() {
        let catalog = TemplateCatalog::builtin("42");
        let template = catalog.lookup("instagram", "destination").unwrap();
        assert_eq!(
            template.field_names(),
            vec!["destination_name", "price_text", "caption_text", "main_image"]
        );
        let err = catalog.lookup("linkedin", "destination").unwrap_err();
        assert_eq!(err.platform, "linkedin");
        assert!(catalog.required_fields("linkedin", "destination").is_empty());
    }

    #[test]
    fn content_types_and_platforms() {
        let catalog = TemplateCatalog::builtin("42");
        assert_eq!(
            catalog.content_types(),
            vec!["events", "destination", "promo", "tips", "seasonal", "generic"]
        );
        assert_eq!(catalog.platforms_for("events"), vec!["instagram", "linkedin"]);
        assert_eq!(catalog.platforms_for("promo"), vec!["instagram", "tiktok"]);
        assert_eq!(catalog.platforms_for("generic"), vec!["tiktok"]);
        assert!(catalog.platforms_for("recipes").is_empty());
    }

    #[test]
    fn tiktok_templates_are_video() {
        let catalog = TemplateCatalog::builtin("42");
        let promo = catalog.lookup("tiktok", "promo").unwrap();
        assert!(promo.is_video);
        assert!(promo.field("video_background").is_some());
        assert!(promo.field("main_image").is_none());
    }

    #[test]
    fn linkedin_has_derived_hashtags() {
        let catalog = TemplateCatalog::builtin("42");
        let field = catalog
            .lookup("linkedin", "tips")
            .unwrap()
            .field("hashtags")
            .unwrap();
        assert_eq!(field.source, FieldSource::Derived);
    }

    #[test]
    fn template_id_format() {
        let catalog = TemplateCatalog::builtin("351915950259");
        assert_eq!(
            catalog.template_id("Instagram", "Destination"),
            "instagram_351915950259_destination"
        );
    }

    #[test]
    fn titles() {
        assert_eq!(platform_title("linkedin"), "LinkedIn");
        assert_eq!(platform_title("instagram"), "Instagram");
        assert_eq!(content_type_title("events"), "Events");
    }
}
