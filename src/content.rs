//! Content collaborators
//!
//! Caption generation, stock media search, design rendering and publishing.
//! Handlers only see the traits; adapters live in the submodules and are
//! wrapped in logging decorators at startup.

mod error;
pub mod media_search;
pub mod openai;
pub mod publish;
pub mod render;

pub use error::ServiceError;
pub use media_search::ProviderChain;
pub use openai::OpenAiGenerator;
pub use publish::LogPublisher;
pub use render::SwitchboardRenderer;

use crate::messaging::MediaKind;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Caption used whenever generation fails or is not configured
pub fn default_caption(text: &str) -> String {
    format!("✨ {}\n\n#trending #marketing", text.trim())
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_caption(&self, prompt: &str) -> Result<String, ServiceError>;

    async fn generate_template_caption(
        &self,
        template_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError>;

    async fn generate_search_query(
        &self,
        template_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait MediaSearch: Send + Sync {
    async fn search_images(&self, query: &str, limit: usize) -> Result<Vec<String>, ServiceError>;

    async fn search_videos(&self, query: &str, limit: usize) -> Result<Vec<String>, ServiceError>;
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Compose a final asset, returning its URL
    async fn render(
        &self,
        template_id: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError>;
}

/// What gets published to one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDraft {
    pub caption: String,
    pub media_kind: Option<MediaKind>,
    pub media_url: Option<String>,
    pub schedule: Option<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a post, returning a receipt identifier
    async fn publish(&self, platform: &str, post: &PostDraft) -> Result<String, ServiceError>;
}

// ============================================================================
// Logging decorators
// ============================================================================

fn log_outcome<T>(service: &str, operation: &str, started: Instant, result: &Result<T, ServiceError>) {
    let duration_ms = started.elapsed().as_millis();
    match result {
        Ok(_) => tracing::info!(service, operation, duration_ms, "Collaborator call completed"),
        Err(e) => tracing::error!(
            service,
            operation,
            duration_ms,
            kind = ?e.kind,
            transient = e.kind.is_transient(),
            error = %e.message,
            "Collaborator call failed"
        ),
    }
}

pub struct LoggingGenerator {
    inner: Arc<dyn ContentGenerator>,
}

impl LoggingGenerator {
    pub fn new(inner: Arc<dyn ContentGenerator>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ContentGenerator for LoggingGenerator {
    async fn generate_caption(&self, prompt: &str) -> Result<String, ServiceError> {
        let started = Instant::now();
        let result = self.inner.generate_caption(prompt).await;
        log_outcome("generator", "caption", started, &result);
        result
    }

    async fn generate_template_caption(
        &self,
        template_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        let started = Instant::now();
        let result = self.inner.generate_template_caption(template_type, fields).await;
        log_outcome("generator", "template_caption", started, &result);
        result
    }

    async fn generate_search_query(
        &self,
        template_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        let started = Instant::now();
        let result = self.inner.generate_search_query(template_type, fields).await;
        log_outcome("generator", "search_query", started, &result);
        result
    }
}

pub struct LoggingMediaSearch {
    inner: Arc<dyn MediaSearch>,
}

impl LoggingMediaSearch {
    pub fn new(inner: Arc<dyn MediaSearch>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl MediaSearch for LoggingMediaSearch {
    async fn search_images(&self, query: &str, limit: usize) -> Result<Vec<String>, ServiceError> {
        let started = Instant::now();
        let result = self.inner.search_images(query, limit).await;
        log_outcome("media_search", "images", started, &result);
        result
    }

    async fn search_videos(&self, query: &str, limit: usize) -> Result<Vec<String>, ServiceError> {
        let started = Instant::now();
        let result = self.inner.search_videos(query, limit).await;
        log_outcome("media_search", "videos", started, &result);
        result
    }
}

pub struct LoggingRenderer {
    inner: Arc<dyn Renderer>,
}

impl LoggingRenderer {
    pub fn new(inner: Arc<dyn Renderer>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Renderer for LoggingRenderer {
    async fn render(
        &self,
        template_id: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        let started = Instant::now();
        let result = self.inner.render(template_id, fields).await;
        log_outcome("renderer", template_id, started, &result);
        result
    }
}

pub struct LoggingPublisher {
    inner: Arc<dyn Publisher>,
}

impl LoggingPublisher {
    pub fn new(inner: Arc<dyn Publisher>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Publisher for LoggingPublisher {
    async fn publish(&self, platform: &str, post: &PostDraft) -> Result<String, ServiceError> {
        let started = Instant::now();
        let result = self.inner.publish(platform, post).await;
        log_outcome("publisher", platform, started, &result);
        result
    }
}

/// Generator used when no API key is configured
pub struct UnconfiguredGenerator;

#[async_trait]
impl ContentGenerator for UnconfiguredGenerator {
    async fn generate_caption(&self, _prompt: &str) -> Result<String, ServiceError> {
        Err(ServiceError::not_configured("openai"))
    }

    async fn generate_template_caption(
        &self,
        _template_type: &str,
        _fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        Err(ServiceError::not_configured("openai"))
    }

    async fn generate_search_query(
        &self,
        _template_type: &str,
        _fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        Err(ServiceError::not_configured("openai"))
    }
}

/// Renderer used when no rendering key is configured
pub struct UnconfiguredRenderer;

#[async_trait]
impl Renderer for UnconfiguredRenderer {
    async fn render(
        &self,
        _template_id: &str,
        _fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        Err(ServiceError::not_configured("switchboard"))
    }
}
