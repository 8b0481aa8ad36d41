//! HTTP API: the messaging webhook plus health and diagnostics

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::Engine;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Expected `hub.verify_token`; verification always fails when unset
    pub verify_token: Option<String>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, verify_token: Option<String>) -> Self {
        Self {
            engine,
            verify_token,
        }
    }
}
