//! SQLite-backed session store
//!
//! State is stored by name and context as JSON. Writes go through a single
//! connection guarded by a mutex.

use super::{SessionSnapshot, SessionStore};
use crate::workflow::{Context, WorkflowState};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    user_id TEXT PRIMARY KEY,
    state TEXT NOT NULL DEFAULT 'INIT',
    context TEXT NOT NULL DEFAULT '{}',
    updated_at TEXT NOT NULL
);
";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid stored JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable session store.
///
/// All users share one connection, so calls are serialized and run
/// synchronously on the calling (async worker) thread. Each call holds the
/// lock for a single statement only. Deployments that need sessions to scale
/// across keys should use [`InMemorySessionStore`](super::InMemorySessionStore).
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure(conn: &Connection, user_id: &str) -> StoreResult<()> {
        conn.execute(
            "INSERT OR IGNORE INTO sessions (user_id, updated_at) VALUES (?1, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn try_get_state(&self, user_id: &str) -> StoreResult<WorkflowState> {
        let conn = self.conn();
        Self::ensure(&conn, user_id)?;
        let name: String = conn.query_row(
            "SELECT state FROM sessions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(parse_state(&name))
    }

    fn try_get_context(&self, user_id: &str) -> StoreResult<Context> {
        let conn = self.conn();
        Self::ensure(&conn, user_id)?;
        let json: String = conn.query_row(
            "SELECT context FROM sessions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(serde_json::from_str(&json)?)
    }

    fn try_set_state(&self, user_id: &str, state: WorkflowState) -> StoreResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO sessions (user_id, state, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
            params![user_id, state.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn try_update_context(&self, user_id: &str, context: &Context) -> StoreResult<()> {
        let json = serde_json::to_string(context)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO sessions (user_id, context, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET context = excluded.context, updated_at = excluded.updated_at",
            params![user_id, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn try_reset(&self, user_id: &str) -> StoreResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO sessions (user_id, state, context, updated_at)
             VALUES (?1, 'INIT', '{}', ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn try_snapshot(&self, user_id: &str) -> StoreResult<Option<SessionSnapshot>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT state, context, updated_at FROM sessions WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((state, context, updated_at)) = row else {
            return Ok(None);
        };
        Ok(Some(SessionSnapshot {
            user_id: user_id.to_string(),
            state: parse_state(&state),
            context: serde_json::from_str(&context)?,
            updated_at: parse_datetime(&updated_at),
        }))
    }

    fn try_count(&self) -> StoreResult<usize> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn log_failure(user_id: &str, operation: &str, error: &StoreError) {
    tracing::error!(user_id = %user_id, operation, error = %error, "Session store failure");
}

impl SessionStore for SqliteSessionStore {
    fn get_state(&self, user_id: &str) -> WorkflowState {
        self.try_get_state(user_id).unwrap_or_else(|e| {
            log_failure(user_id, "get_state", &e);
            WorkflowState::Init
        })
    }

    fn set_state(&self, user_id: &str, state: WorkflowState) {
        if let Err(e) = self.try_set_state(user_id, state) {
            log_failure(user_id, "set_state", &e);
        }
    }

    fn get_context(&self, user_id: &str) -> Context {
        self.try_get_context(user_id).unwrap_or_else(|e| {
            log_failure(user_id, "get_context", &e);
            Context::default()
        })
    }

    fn update_context(&self, user_id: &str, context: Context) {
        if let Err(e) = self.try_update_context(user_id, &context) {
            log_failure(user_id, "update_context", &e);
        }
    }

    fn reset(&self, user_id: &str) {
        if let Err(e) = self.try_reset(user_id) {
            log_failure(user_id, "reset", &e);
        }
    }

    fn snapshot(&self, user_id: &str) -> Option<SessionSnapshot> {
        self.try_snapshot(user_id).unwrap_or_else(|e| {
            log_failure(user_id, "snapshot", &e);
            None
        })
    }

    fn session_count(&self) -> usize {
        self.try_count().unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to count sessions");
            0
        })
    }
}

/// Names this build does not know map to `Unknown`
fn parse_state(name: &str) -> WorkflowState {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .unwrap_or(WorkflowState::Unknown)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
