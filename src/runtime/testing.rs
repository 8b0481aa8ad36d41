//! Mock implementations for testing
//!
//! These mocks enable workflow and engine tests without real I/O.

use super::errors::ErrorLog;
use super::processor::Worker;
use super::traits::TurnRunner;
use super::Engine;
use crate::content::{ContentGenerator, MediaSearch, PostDraft, Publisher, Renderer, ServiceError};
use crate::messaging::{Button, ListSection, MediaItem, MessagingError, Messenger};
use crate::session::{InMemorySessionStore, SessionStore};
use crate::templates::TemplateCatalog;
use crate::workflow::{
    Collaborators, Context, Dispatcher, Settings, WorkflowEnv, WorkflowError, WorkflowState,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_CLIENT_ID: &str = "923408957390";

// ============================================================================
// Recording Messenger
// ============================================================================

/// One outbound call, as the messenger received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text {
        user: String,
        text: String,
    },
    Media {
        user: String,
        items: Vec<MediaItem>,
    },
    Buttons {
        user: String,
        header: String,
        body: String,
        buttons: Vec<Button>,
    },
    List {
        user: String,
        header: String,
        body: String,
        button_label: String,
        sections: Vec<ListSection>,
    },
}

impl Outbound {
    pub fn user(&self) -> &str {
        match self {
            Outbound::Text { user, .. }
            | Outbound::Media { user, .. }
            | Outbound::Buttons { user, .. }
            | Outbound::List { user, .. } => user,
        }
    }

    /// Text, body, or first media caption
    pub fn body(&self) -> &str {
        match self {
            Outbound::Text { text, .. } => text,
            Outbound::Buttons { body, .. } | Outbound::List { body, .. } => body,
            Outbound::Media { items, .. } => items
                .first()
                .and_then(|i| i.caption.as_deref())
                .unwrap_or_default(),
        }
    }

    /// Option ids offered by a buttons or list message
    pub fn option_ids(&self) -> Vec<String> {
        match self {
            Outbound::Buttons { buttons, .. } => buttons.iter().map(|b| b.id.clone()).collect(),
            Outbound::List { sections, .. } => sections
                .iter()
                .flat_map(|s| s.rows.iter().map(|r| r.id.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Messenger that records every call
pub struct RecordingMessenger {
    sent: Mutex<Vec<Outbound>>,
    fail: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent send fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_id: &str) -> Vec<Outbound> {
        self.sent()
            .into_iter()
            .filter(|o| o.user() == user_id)
            .collect()
    }

    /// Bodies of everything sent to `user_id`
    pub fn bodies_to(&self, user_id: &str) -> Vec<String> {
        self.sent_to(user_id)
            .iter()
            .map(|o| o.body().to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    fn push(&self, outbound: Outbound) -> Result<(), MessagingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MessagingError::Transport("mock send failure".to_string()));
        }
        self.sent.lock().unwrap().push(outbound);
        Ok(())
    }
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), MessagingError> {
        self.push(Outbound::Text {
            user: user_id.to_string(),
            text: text.to_string(),
        })
    }

    async fn send_media(&self, user_id: &str, items: &[MediaItem]) -> Result<(), MessagingError> {
        self.push(Outbound::Media {
            user: user_id.to_string(),
            items: items.to_vec(),
        })
    }

    async fn send_reply_buttons(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<(), MessagingError> {
        self.push(Outbound::Buttons {
            user: user_id.to_string(),
            header: header.to_string(),
            body: body.to_string(),
            buttons: buttons.to_vec(),
        })
    }

    async fn send_list(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        button_label: &str,
        sections: &[ListSection],
    ) -> Result<(), MessagingError> {
        self.push(Outbound::List {
            user: user_id.to_string(),
            header: header.to_string(),
            body: body.to_string(),
            button_label: button_label.to_string(),
            sections: sections.to_vec(),
        })
    }

    /// Ids starting with `missing` cannot be resolved
    async fn resolve_media(&self, media_id: &str) -> Result<String, ServiceError> {
        if media_id.starts_with("missing") {
            return Err(ServiceError::invalid_response("whatsapp", "media not found"));
        }
        Ok(format!("https://media.test/{media_id}"))
    }
}

// ============================================================================
// Scripted Content Generator
// ============================================================================

/// Generator returning queued captions, or deterministic defaults
pub struct ScriptedGenerator {
    captions: Mutex<VecDeque<String>>,
    fail: bool,
    /// Record of operations called
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            captions: Mutex::new(VecDeque::new()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn queue_caption(&self, caption: impl Into<String>) {
        self.captions.lock().unwrap().push_back(caption.into());
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, operation: &str, default: String) -> Result<String, ServiceError> {
        self.calls.lock().unwrap().push(operation.to_string());
        if self.fail {
            return Err(ServiceError::network("openai", "mock generator failure"));
        }
        if operation == "search_query" {
            return Ok(default);
        }
        Ok(self.captions.lock().unwrap().pop_front().unwrap_or(default))
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate_caption(&self, prompt: &str) -> Result<String, ServiceError> {
        self.answer("caption", format!("Caption for: {prompt}"))
    }

    async fn generate_template_caption(
        &self,
        template_type: &str,
        _fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        self.answer("template_caption", format!("{template_type} caption"))
    }

    async fn generate_search_query(
        &self,
        _template_type: &str,
        _fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        self.answer("search_query", "stock photo".to_string())
    }
}

// ============================================================================
// Static Media Search
// ============================================================================

/// Search that always returns the same candidates
pub struct StaticMediaSearch {
    images: Vec<String>,
    videos: Vec<String>,
    /// Record of queries
    pub queries: Mutex<Vec<String>>,
}

impl StaticMediaSearch {
    pub fn new(images: &[&str], videos: &[&str]) -> Self {
        Self {
            images: images.iter().map(|s| (*s).to_string()).collect(),
            videos: videos.iter().map(|s| (*s).to_string()).collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[], &[])
    }
}

impl Default for StaticMediaSearch {
    fn default() -> Self {
        Self::new(
            &[
                "https://img.test/1.jpg",
                "https://img.test/2.jpg",
                "https://img.test/3.jpg",
            ],
            &["https://vid.test/1.mp4", "https://vid.test/2.mp4"],
        )
    }
}

#[async_trait]
impl MediaSearch for StaticMediaSearch {
    async fn search_images(&self, query: &str, limit: usize) -> Result<Vec<String>, ServiceError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.images.iter().take(limit).cloned().collect())
    }

    async fn search_videos(&self, query: &str, limit: usize) -> Result<Vec<String>, ServiceError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.videos.iter().take(limit).cloned().collect())
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

pub struct MockRenderer {
    fail: bool,
    /// Record of (template id, fields) renders
    pub renders: Mutex<Vec<(String, BTreeMap<String, String>)>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            fail: false,
            renders: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn recorded_renders(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.renders.lock().unwrap().clone()
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn render(
        &self,
        template_id: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        self.renders
            .lock()
            .unwrap()
            .push((template_id.to_string(), fields.clone()));
        if self.fail {
            return Err(ServiceError::network("switchboard", "mock render failure"));
        }
        Ok(format!("https://render.test/{template_id}.png"))
    }
}

// ============================================================================
// Recording Publisher
// ============================================================================

pub struct RecordingPublisher {
    failing: HashSet<String>,
    /// Record of (platform, draft) publishes, failed ones included
    pub posts: Mutex<Vec<(String, PostDraft)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            posts: Mutex::new(Vec::new()),
        }
    }

    /// Publishing to any of `platforms` fails
    pub fn failing_on(platforms: &[&str]) -> Self {
        Self {
            failing: platforms.iter().map(|p| (*p).to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn recorded_posts(&self) -> Vec<(String, PostDraft)> {
        self.posts.lock().unwrap().clone()
    }
}

impl Default for RecordingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, platform: &str, post: &PostDraft) -> Result<String, ServiceError> {
        self.posts
            .lock()
            .unwrap()
            .push((platform.to_string(), post.clone()));
        if self.failing.contains(platform) {
            return Err(ServiceError::network("publisher", "mock publish failure"));
        }
        Ok(format!("{platform}-receipt"))
    }
}

// ============================================================================
// Recording Turn Runner
// ============================================================================

/// Runner that records turns and checks a user never has two at once.
///
/// The text `fail` returns an error and `panic` panics, after recording.
pub struct RecordingRunner {
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
    active: Mutex<HashMap<String, usize>>,
    overlapped: AtomicBool,
}

impl RecordingRunner {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Mutex::new(Vec::new()),
            active: Mutex::new(HashMap::new()),
            overlapped: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts handled for `user_id`, in handling order
    pub fn texts_for(&self, user_id: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, t)| t)
            .collect()
    }

    /// Whether any user ever had two turns running at once
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TurnRunner for RecordingRunner {
    async fn run_turn(&self, user_id: &str, text: &str) -> Result<(), WorkflowError> {
        self.calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        {
            let mut active = self.active.lock().unwrap();
            let count = active.entry(user_id.to_string()).or_default();
            *count += 1;
            if *count > 1 {
                self.overlapped.store(true, Ordering::SeqCst);
            }
        }
        tokio::time::sleep(self.delay).await;
        if let Some(count) = self.active.lock().unwrap().get_mut(user_id) {
            *count -= 1;
        }

        match text {
            "fail" => Err(MessagingError::Transport("scripted failure".to_string()).into()),
            "panic" => panic!("scripted panic"),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Test Engine Builder
// ============================================================================

/// Mock collaborators plus an in-memory store, wired the way `main` wires
/// the real ones
pub struct TestEngine {
    pub store: Arc<InMemorySessionStore>,
    pub messenger: Arc<RecordingMessenger>,
    pub generator: Arc<ScriptedGenerator>,
    pub media: Arc<StaticMediaSearch>,
    pub renderer: Arc<MockRenderer>,
    pub publisher: Arc<RecordingPublisher>,
    pub errors: Arc<ErrorLog>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemorySessionStore::new()),
            messenger: Arc::new(RecordingMessenger::new()),
            generator: Arc::new(ScriptedGenerator::new()),
            media: Arc::new(StaticMediaSearch::default()),
            renderer: Arc::new(MockRenderer::new()),
            publisher: Arc::new(RecordingPublisher::new()),
            errors: Arc::new(ErrorLog::new(16)),
        }
    }

    #[must_use]
    pub fn generator(mut self, generator: ScriptedGenerator) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    #[must_use]
    pub fn media(mut self, media: StaticMediaSearch) -> Self {
        self.media = Arc::new(media);
        self
    }

    #[must_use]
    pub fn renderer(mut self, renderer: MockRenderer) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    #[must_use]
    pub fn publisher(mut self, publisher: RecordingPublisher) -> Self {
        self.publisher = Arc::new(publisher);
        self
    }

    pub fn env(&self) -> WorkflowEnv {
        WorkflowEnv {
            store: self.store.clone(),
            catalog: Arc::new(TemplateCatalog::builtin(TEST_CLIENT_ID)),
            collaborators: Collaborators {
                messenger: self.messenger.clone(),
                generator: self.generator.clone(),
                media: self.media.clone(),
                renderer: self.renderer.clone(),
                publisher: self.publisher.clone(),
            },
            settings: Settings {
                collaborator_timeout: Duration::from_secs(5),
                media_candidates: 4,
            },
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.env())
    }

    /// Engine driving `runner` with this harness's store and messenger
    pub fn engine(&self, runner: Arc<dyn TurnRunner>, max_pending: usize) -> Engine {
        Engine::new(
            Worker {
                runner,
                store: self.store.clone(),
                messenger: self.messenger.clone(),
                errors: self.errors.clone(),
            },
            max_pending,
        )
    }

    pub fn state(&self, user_id: &str) -> WorkflowState {
        self.store.get_state(user_id)
    }

    pub fn context(&self, user_id: &str) -> Context {
        self.store.get_context(user_id)
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::SubmitOutcome;
    use crate::workflow::prompts;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn same_user_texts_run_in_order_without_overlap() {
        let harness = TestEngine::new();
        let runner = Arc::new(RecordingRunner::new(Duration::from_millis(5)));
        let engine = harness.engine(runner.clone(), 20);

        for (a, b) in [("a", "x"), ("b", "y"), ("c", "z")] {
            engine.submit("u1", a);
            engine.submit("u2", b);
        }

        assert!(wait_until(WAIT, || runner.calls().len() == 6).await);
        assert_eq!(runner.texts_for("u1"), vec!["a", "b", "c"]);
        assert_eq!(runner.texts_for("u2"), vec!["x", "y", "z"]);
        assert!(!runner.overlapped());
    }

    #[tokio::test]
    async fn failed_turn_is_recorded_and_worker_continues() {
        let harness = TestEngine::new();
        let runner = Arc::new(RecordingRunner::new(Duration::ZERO));
        let engine = harness.engine(runner.clone(), 20);

        engine.submit("15550001111", "fail");
        engine.submit("15550001111", "next");

        assert!(wait_until(WAIT, || runner.calls().len() == 2).await);
        assert!(wait_until(WAIT, || harness.errors.count() == 1).await);

        let record = &harness.errors.recent(1)[0];
        assert_eq!(record.user_id, "15550001111");
        assert_eq!(record.input, "fail");
        assert!(record.message.contains("scripted failure"));
        assert!(record.error_id.starts_with("001111_"));

        let expected = prompts::turn_failed(&record.error_id);
        assert!(wait_until(WAIT, || harness
            .messenger
            .bodies_to("15550001111")
            .contains(&expected))
        .await);
    }

    #[tokio::test]
    async fn panicking_turn_is_caught() {
        let harness = TestEngine::new();
        let runner = Arc::new(RecordingRunner::new(Duration::ZERO));
        let engine = harness.engine(runner.clone(), 20);

        engine.submit("u1", "panic");
        engine.submit("u1", "after");

        assert!(wait_until(WAIT, || runner.texts_for("u1").len() == 2).await);
        assert!(wait_until(WAIT, || harness.errors.count() == 1).await);
        assert!(harness.errors.recent(1)[0].message.contains("scripted panic"));
    }

    #[tokio::test]
    async fn full_mailbox_rejects_and_notifies() {
        let harness = TestEngine::new();
        let runner = Arc::new(RecordingRunner::new(Duration::from_millis(300)));
        let engine = harness.engine(runner.clone(), 2);

        assert_eq!(engine.submit("u1", "a"), SubmitOutcome::Started);
        assert!(wait_until(WAIT, || runner.calls().len() == 1).await);

        assert_eq!(engine.submit("u1", "b"), SubmitOutcome::Queued);
        assert_eq!(engine.submit("u1", "c"), SubmitOutcome::Queued);
        assert_eq!(engine.submit("u1", "d"), SubmitOutcome::Rejected);
        assert_eq!(engine.pending_messages(), 2);

        assert!(wait_until(WAIT, || harness
            .messenger
            .bodies_to("u1")
            .iter()
            .any(|b| b == prompts::TOO_MANY_PENDING))
        .await);
        assert!(wait_until(WAIT, || runner.calls().len() == 3).await);
        assert_eq!(runner.texts_for("u1"), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn idle_worker_exits_and_restarts() {
        let harness = TestEngine::new();
        let runner = Arc::new(RecordingRunner::new(Duration::ZERO));
        let engine = harness.engine(runner.clone(), 20);

        assert_eq!(engine.submit("u1", "a"), SubmitOutcome::Started);
        assert!(wait_until(WAIT, || runner.calls().len() == 1 && engine.active_workers() == 0).await);
        assert_eq!(engine.submit("u1", "b"), SubmitOutcome::Started);
        assert!(wait_until(WAIT, || runner.calls().len() == 2).await);
    }

    #[tokio::test]
    async fn engine_drives_the_dispatcher() {
        let harness = TestEngine::new();
        let engine = harness.engine(Arc::new(harness.dispatcher()), 20);

        engine.submit("u1", "hi");
        engine.submit("u1", "destination");

        assert!(wait_until(WAIT, || harness.messenger.sent_to("u1").len() == 2).await);
        assert_eq!(harness.state("u1"), WorkflowState::PlatformSelectionForContent);
        assert_eq!(
            harness.context("u1").selected_content_type.as_deref(),
            Some("destination")
        );
    }
}
