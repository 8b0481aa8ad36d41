//! Field resolution: what to ask the user next
//!
//! A field is missing unless it is in `template_data` or the context exposes
//! a non-empty attribute of the same name. Missing fields are ordered by
//! [`FIELD_PRIORITY`] (unlisted fields keep template order, after listed ones)
//! and only fields the user must type are ever returned.

use super::{FieldSource, Template, TemplateField, ValidationError};
use crate::workflow::{Context, WorkflowState};
use std::collections::BTreeMap;

/// Collection order for well-known fields
pub const FIELD_PRIORITY: [&str; 6] = [
    "destination_name",
    "event_name",
    "price_text",
    "main_image",
    "event_image",
    "video_background",
];

/// Word limit on any `*_name` field without an explicit limit
pub const NAME_MAX_WORDS: usize = 5;

/// The next prompt to show the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequest {
    pub field: String,
    pub state: WorkflowState,
    pub prompt: String,
}

fn priority(name: &str) -> usize {
    FIELD_PRIORITY
        .iter()
        .position(|p| *p == name)
        .unwrap_or(FIELD_PRIORITY.len())
}

/// Names of template fields not yet available in the context
pub fn missing_fields<'t>(template: &'t Template, ctx: &Context) -> Vec<&'t str> {
    template
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .filter(|name| !ctx.has_field(name))
        .collect()
}

fn needs_user(field: &TemplateField, ctx: &Context) -> bool {
    match field.source {
        FieldSource::UserInput => field.prompt_state.is_some(),
        FieldSource::AiGenerated => {
            field.prompt_state.is_some() && field.depends_on.iter().all(|d| ctx.has_field(d))
        }
        FieldSource::ExternalService | FieldSource::Derived => false,
    }
}

/// First missing field that must be collected from the user, by priority
pub fn next_field(template: &Template, ctx: &Context) -> Option<FieldRequest> {
    let mut missing = missing_fields(template, ctx);
    missing.sort_by_key(|name| priority(name));

    missing
        .into_iter()
        .filter_map(|name| template.field(name))
        .find(|field| needs_user(field, ctx))
        .and_then(|field| {
            let state = field.prompt_state?;
            let prompt = if field.prompt.is_empty() {
                format!("Please enter the {}:", field.label())
            } else {
                field.prompt.clone()
            };
            Some(FieldRequest {
                field: field.name.clone(),
                state,
                prompt,
            })
        })
}

/// Normalise and check a typed value against the field's constraints
pub fn validate_field(field: &TemplateField, raw: &str) -> Result<String, ValidationError> {
    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.is_empty() {
        return Err(ValidationError::Empty {
            field: field.label(),
        });
    }
    if let Some(max) = field.word_limit() {
        if words.len() > max {
            return Err(ValidationError::TooManyWords {
                field: field.label(),
                max,
                actual: words.len(),
            });
        }
    }
    Ok(words.join(" "))
}

/// Hashtags already in the caption, or one built from the content type
pub fn derive_hashtags(caption: &str, content_type: &str) -> String {
    let tags: Vec<&str> = caption
        .split_whitespace()
        .filter(|w| w.len() > 1 && w.starts_with('#'))
        .collect();
    if tags.is_empty() {
        format!("#{content_type}")
    } else {
        tags.join(" ")
    }
}

/// Resolve every available field value for rendering
pub fn prepare_template_data(template: &Template, ctx: &Context) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    for field in &template.fields {
        let collected = ctx
            .template_data
            .get(&field.name)
            .filter(|v| !v.trim().is_empty())
            .cloned();
        let value = collected.or_else(|| match field.source {
            FieldSource::Derived if field.name == "hashtags" => ctx
                .attribute("caption_text")
                .map(|caption| derive_hashtags(caption, &template.content_type)),
            FieldSource::Derived => None,
            _ => ctx.attribute(&field.name).map(str::to_string),
        });
        if let Some(value) = value {
            data.insert(field.name.clone(), value);
        }
    }
    data
}
