//! Post templates
//!
//! A template describes, per (platform, content type), which fields must be
//! collected before a post can be rendered and where each value comes from.

mod catalog;
pub mod resolver;

pub use catalog::{content_type_title, platform_title, TemplateCatalog};
pub use resolver::{next_field, prepare_template_data, validate_field, FieldRequest};

use crate::workflow::WorkflowState;
use thiserror::Error;

/// Where a template field's value originates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Typed by the user in a dedicated prompt state
    UserInput,
    /// Produced by the content generator, possibly from user-supplied details
    AiGenerated,
    /// Fetched from a collaborator (stock media, uploads)
    ExternalService,
    /// Computed from other fields
    Derived,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateField {
    pub name: String,
    pub source: FieldSource,
    pub prompt: String,
    pub max_words: Option<usize>,
    /// State that collects this field from the user, if any
    pub prompt_state: Option<WorkflowState>,
    pub depends_on: Vec<String>,
}

impl TemplateField {
    pub fn new(name: &str, source: FieldSource) -> Self {
        Self {
            name: name.to_string(),
            source,
            prompt: String::new(),
            max_words: None,
            prompt_state: None,
            depends_on: Vec::new(),
        }
    }

    /// Collected from the user in `state`
    #[must_use]
    pub fn asked_in(mut self, state: WorkflowState, prompt: &str) -> Self {
        self.prompt_state = Some(state);
        self.prompt = prompt.to_string();
        self
    }

    #[must_use]
    pub fn max_words(mut self, max: usize) -> Self {
        self.max_words = Some(max);
        self
    }

    #[must_use]
    pub fn depends_on(mut self, fields: &[&str]) -> Self {
        self.depends_on = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Word limit, including the implicit limit on name-like fields
    pub fn word_limit(&self) -> Option<usize> {
        self.max_words.or_else(|| {
            self.name
                .ends_with("_name")
                .then_some(resolver::NAME_MAX_WORDS)
        })
    }

    /// Human-readable field name for prompts and errors
    pub fn label(&self) -> String {
        self.name.replace('_', " ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub platform: String,
    pub content_type: String,
    pub fields: Vec<TemplateField>,
    /// Video templates search for and publish videos
    pub is_video: bool,
}

impl Template {
    pub fn field(&self, name: &str) -> Option<&TemplateField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_for_state(&self, state: WorkflowState) -> Option<&TemplateField> {
        self.fields.iter().find(|f| f.prompt_state == Some(state))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No template for {platform}/{content_type}")]
pub struct TemplateNotFound {
    pub platform: String,
    pub content_type: String,
}

/// User input that fails a field constraint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a {field}.")]
    Empty { field: String },
    #[error("The {field} can be at most {max} words (you sent {actual}). Please try a shorter one.")]
    TooManyWords {
        field: String,
        max: usize,
        actual: usize,
    },
    #[error("Please reply with text for the {field}, not a photo or video.")]
    TextExpected { field: String },
}
