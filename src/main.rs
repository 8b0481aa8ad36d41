//! PostPilot - conversational social-media post builder
//!
//! Receives WhatsApp webhooks, walks each user through a content-creation
//! workflow, and renders and publishes the resulting post.

mod api;
mod config;
mod content;
mod messaging;
mod runtime;
mod session;
mod templates;
mod workflow;

use api::{create_router, AppState};
use config::Config;
use content::{
    ContentGenerator, LogPublisher, LoggingGenerator, LoggingMediaSearch, LoggingPublisher,
    LoggingRenderer, OpenAiGenerator, ProviderChain, Renderer, SwitchboardRenderer,
    UnconfiguredGenerator, UnconfiguredRenderer,
};
use messaging::{LoggingMessenger, Messenger, WhatsAppClient};
use runtime::{Engine, ErrorLog, Worker};
use session::{InMemorySessionStore, SessionStore, SqliteSessionStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use templates::TemplateCatalog;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workflow::{Collaborators, Dispatcher, Settings, WorkflowEnv};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postpilot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env();
    for key in config.missing_keys() {
        tracing::warn!(key, "Not configured; the dependent feature will be unavailable");
    }

    // Sessions
    let store: Arc<dyn SessionStore> = match &config.session_db_path {
        Some(path) => {
            if let Some(parent) = PathBuf::from(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            tracing::info!(path = %path, "Opening session database");
            Arc::new(SqliteSessionStore::open(path)?)
        }
        None => {
            tracing::info!("Keeping sessions in memory");
            Arc::new(InMemorySessionStore::new())
        }
    };

    let messenger: Arc<dyn Messenger> = Arc::new(LoggingMessenger::new(Arc::new(
        WhatsAppClient::new(
            config.whatsapp_token.clone().unwrap_or_default(),
            config.whatsapp_phone_number_id.clone().unwrap_or_default(),
            &config.whatsapp_api_base,
            config.collaborator_timeout,
        ),
    )));

    let env = WorkflowEnv {
        store: Arc::clone(&store),
        catalog: Arc::new(TemplateCatalog::builtin(config.template_client_id.clone())),
        collaborators: build_collaborators(&config, Arc::clone(&messenger))?,
        settings: Settings {
            collaborator_timeout: config.collaborator_timeout,
            media_candidates: config.media_candidates,
        },
    };

    let engine = Engine::new(
        Worker {
            runner: Arc::new(Dispatcher::new(env)),
            store,
            messenger,
            errors: Arc::new(ErrorLog::new(config.error_log_capacity)),
        },
        config.max_pending_messages,
    );

    let state = AppState::new(Arc::new(engine), config.whatsapp_verify_token.clone());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("PostPilot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire the external services, each behind its logging decorator.
/// Services without credentials fall back to their unconfigured variants.
fn build_collaborators(
    config: &Config,
    messenger: Arc<dyn Messenger>,
) -> Result<Collaborators, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(config.collaborator_timeout)
        .build()?;

    let generator: Arc<dyn ContentGenerator> = match &config.openai_api_key {
        Some(key) => Arc::new(OpenAiGenerator::new(
            key.clone(),
            config.openai_model.clone(),
            config.openai_base_url.as_deref(),
            config.collaborator_timeout,
        )),
        None => Arc::new(UnconfiguredGenerator),
    };

    let providers = ProviderChain::from_config(config, &client);
    tracing::info!(providers = ?providers.provider_names(), "Media providers");

    let renderer: Arc<dyn Renderer> = match &config.switchboard_api_key {
        Some(key) => Arc::new(SwitchboardRenderer::new(
            key.clone(),
            config.switchboard_base_url.as_deref(),
            config.collaborator_timeout,
        )),
        None => Arc::new(UnconfiguredRenderer),
    };

    Ok(Collaborators {
        messenger,
        generator: Arc::new(LoggingGenerator::new(generator)),
        media: Arc::new(LoggingMediaSearch::new(Arc::new(providers))),
        renderer: Arc::new(LoggingRenderer::new(renderer)),
        publisher: Arc::new(LoggingPublisher::new(Arc::new(LogPublisher))),
    })
}
