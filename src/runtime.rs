//! Per-user message processing
//!
//! The [`Engine`] owns one mailbox per user id and spawns a worker whenever
//! a mailbox receives text while idle. Messages from the same user are
//! handled strictly in arrival order; different users run concurrently.

mod errors;
mod processor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use errors::{ErrorLog, ErrorRecord};
pub use processor::{Enqueued, SessionProcessor, Worker};

use crate::messaging::Messenger;
use crate::session::SessionStore;
use crate::workflow::prompts;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// A new worker was started for the user
    Started,
    /// Queued behind the user's running worker
    Queued,
    /// Too many pending messages; the text was dropped
    Rejected,
}

pub struct Engine {
    processors: DashMap<String, Arc<SessionProcessor>>,
    worker: Worker,
    max_pending: usize,
}

impl Engine {
    pub fn new(worker: Worker, max_pending: usize) -> Self {
        Self {
            processors: DashMap::new(),
            worker,
            max_pending,
        }
    }

    /// Queue `text` for `user_id`, starting a worker if none is running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, user_id: &str, text: &str) -> SubmitOutcome {
        let processor = Arc::clone(
            &self
                .processors
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(SessionProcessor::new(user_id, self.max_pending))),
        );

        match processor.enqueue(text.to_string()) {
            Enqueued::StartWorker => {
                let worker = self.worker.clone();
                tokio::spawn(async move { worker.drain(processor).await });
                SubmitOutcome::Started
            }
            Enqueued::Queued => {
                tracing::debug!(user_id = %user_id, pending = processor.pending(), "Queued behind running worker");
                SubmitOutcome::Queued
            }
            Enqueued::Rejected => {
                tracing::warn!(user_id = %user_id, max_pending = self.max_pending, "Mailbox full, dropping message");
                let messenger = Arc::clone(&self.worker.messenger);
                let user_id = user_id.to_string();
                tokio::spawn(async move {
                    if let Err(e) = messenger.send_text(&user_id, prompts::TOO_MANY_PENDING).await {
                        tracing::warn!(user_id = %user_id, error = %e, "Could not send backpressure notice");
                    }
                });
                SubmitOutcome::Rejected
            }
        }
    }

    /// Users whose worker is currently draining a mailbox
    pub fn active_workers(&self) -> usize {
        self.processors.iter().filter(|p| p.is_running()).count()
    }

    pub fn pending_messages(&self) -> usize {
        self.processors.iter().map(|p| p.pending()).sum()
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.worker.store
    }

    pub fn errors(&self) -> &Arc<ErrorLog> {
        &self.worker.errors
    }

    #[allow(dead_code)] // Used in tests
    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.worker.messenger
    }
}
