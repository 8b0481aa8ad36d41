//! Per-user session storage
//!
//! A session is the (state, context) pair for one user id. Sessions are
//! created lazily on first access and never cause an error for callers:
//! backends log storage failures and fall back to the default session.
//!
//! Stores make no attempt to serialize writers for the same user; the
//! engine guarantees a single active worker per user id.

mod sqlite;

pub use sqlite::SqliteSessionStore;

use crate::workflow::{Context, WorkflowState};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Read-only copy of a session, for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub user_id: String,
    pub state: WorkflowState,
    pub context: Context,
    pub updated_at: DateTime<Utc>,
}

pub trait SessionStore: Send + Sync {
    /// Current state; initializes the session if absent
    fn get_state(&self, user_id: &str) -> WorkflowState;

    fn set_state(&self, user_id: &str, state: WorkflowState);

    /// Current context; initializes the session if absent
    fn get_context(&self, user_id: &str) -> Context;

    /// Replace the whole context. Callers read, modify, then write back.
    fn update_context(&self, user_id: &str, context: Context);

    /// Back to `Init` with an empty context
    fn reset(&self, user_id: &str);

    /// Session contents without initializing anything
    fn snapshot(&self, user_id: &str) -> Option<SessionSnapshot>;

    fn session_count(&self) -> usize;
}

#[derive(Debug, Clone)]
struct Session {
    state: WorkflowState,
    context: Context,
    updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: WorkflowState::Init,
            context: Context::default(),
            updated_at: Utc::now(),
        }
    }
}

/// Sharded in-memory store; concurrent access to different users never
/// contends on a global lock
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_state(&self, user_id: &str) -> WorkflowState {
        self.sessions.entry(user_id.to_string()).or_default().state
    }

    fn set_state(&self, user_id: &str, state: WorkflowState) {
        let mut session = self.sessions.entry(user_id.to_string()).or_default();
        tracing::debug!(user_id = %user_id, from = %session.state, to = %state, "State change");
        session.state = state;
        session.updated_at = Utc::now();
    }

    fn get_context(&self, user_id: &str) -> Context {
        self.sessions
            .entry(user_id.to_string())
            .or_default()
            .context
            .clone()
    }

    fn update_context(&self, user_id: &str, context: Context) {
        let mut session = self.sessions.entry(user_id.to_string()).or_default();
        session.context = context;
        session.updated_at = Utc::now();
    }

    fn reset(&self, user_id: &str) {
        self.sessions.insert(user_id.to_string(), Session::default());
    }

    fn snapshot(&self, user_id: &str) -> Option<SessionSnapshot> {
        self.sessions.get(user_id).map(|s| SessionSnapshot {
            user_id: user_id.to_string(),
            state: s.state,
            context: s.context.clone(),
            updated_at: s.updated_at,
        })
    }

    fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
