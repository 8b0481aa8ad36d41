//! Per-user mailbox and worker loop
//!
//! Each user id owns one [`SessionProcessor`]. Texts are queued in arrival
//! order; at most one worker drains a mailbox at a time. The "is a worker
//! running" flag is only ever read and written under the mailbox lock, so
//! concurrent first messages start exactly one worker.

use super::errors::{ErrorLog, ErrorRecord};
use super::traits::TurnRunner;
use crate::messaging::Messenger;
use crate::session::SessionStore;
use crate::workflow::prompts;
use futures::FutureExt;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Result of putting a text into a mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Queued and the caller must start a worker
    StartWorker,
    /// Queued behind a running worker
    Queued,
    /// Mailbox full, text dropped
    Rejected,
}

#[derive(Debug, Default)]
struct Mailbox {
    queue: VecDeque<String>,
    worker_running: bool,
}

pub struct SessionProcessor {
    user_id: String,
    mailbox: Mutex<Mailbox>,
    max_pending: usize,
}

impl SessionProcessor {
    pub fn new(user_id: impl Into<String>, max_pending: usize) -> Self {
        Self {
            user_id: user_id.into(),
            mailbox: Mutex::new(Mailbox::default()),
            max_pending: max_pending.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn enqueue(&self, text: String) -> Enqueued {
        let mut mailbox = self.lock();
        if mailbox.queue.len() >= self.max_pending {
            return Enqueued::Rejected;
        }
        mailbox.queue.push_back(text);
        if mailbox.worker_running {
            Enqueued::Queued
        } else {
            mailbox.worker_running = true;
            Enqueued::StartWorker
        }
    }

    /// Pop the next text, or mark the worker stopped if there is none
    fn next_job(&self) -> Option<String> {
        let mut mailbox = self.lock();
        let job = mailbox.queue.pop_front();
        if job.is_none() {
            mailbox.worker_running = false;
        }
        job
    }

    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.lock().worker_running
    }
}

/// Everything a worker needs besides its mailbox
#[derive(Clone)]
pub struct Worker {
    pub runner: Arc<dyn TurnRunner>,
    pub store: Arc<dyn SessionStore>,
    pub messenger: Arc<dyn Messenger>,
    pub errors: Arc<ErrorLog>,
}

impl Worker {
    /// Process texts until the mailbox is empty. Failed or panicking turns
    /// are recorded and reported to the user; the loop keeps going.
    pub async fn drain(&self, processor: Arc<SessionProcessor>) {
        let user_id = processor.user_id();
        tracing::debug!(user_id = %user_id, "Worker started");

        while let Some(text) = processor.next_job() {
            let started = Instant::now();
            let outcome = AssertUnwindSafe(self.runner.run_turn(user_id, &text))
                .catch_unwind()
                .await;
            let duration_ms = started.elapsed().as_millis();

            let failure = match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(user_id = %user_id, duration_ms, "Turn complete");
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("Turn panicked: {}", panic_message(panic.as_ref())),
            };
            self.report_failure(user_id, &text, failure).await;
        }

        tracing::debug!(user_id = %user_id, "Worker idle, exiting");
    }

    async fn report_failure(&self, user_id: &str, text: &str, message: String) {
        let (state, context) = self
            .store
            .snapshot(user_id)
            .map(|s| {
                let context = serde_json::to_value(&s.context).unwrap_or_default();
                (s.state, context)
            })
            .unwrap_or_default();
        let record = ErrorRecord::new(user_id, state, message, text, context);
        tracing::error!(
            user_id = %user_id,
            error_id = %record.error_id,
            state = %record.state,
            error = %record.message,
            "Turn failed"
        );

        let reply = prompts::turn_failed(&record.error_id);
        self.errors.record(record);
        if let Err(e) = self.messenger.send_text(user_id, &reply).await {
            tracing::warn!(user_id = %user_id, error = %e, "Could not report failure to user");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_enqueue_starts_a_worker() {
        let processor = SessionProcessor::new("u1", 10);
        assert_eq!(processor.enqueue("a".into()), Enqueued::StartWorker);
        assert_eq!(processor.enqueue("b".into()), Enqueued::Queued);
        assert!(processor.is_running());
        assert_eq!(processor.pending(), 2);
    }

    #[test]
    fn draining_to_empty_stops_the_worker() {
        let processor = SessionProcessor::new("u1", 10);
        processor.enqueue("a".into());
        assert_eq!(processor.next_job().as_deref(), Some("a"));
        assert!(processor.is_running());
        assert_eq!(processor.next_job(), None);
        assert!(!processor.is_running());
        assert_eq!(processor.enqueue("b".into()), Enqueued::StartWorker);
    }

    #[test]
    fn full_mailbox_rejects() {
        let processor = SessionProcessor::new("u1", 2);
        processor.enqueue("a".into());
        processor.enqueue("b".into());
        assert_eq!(processor.enqueue("c".into()), Enqueued::Rejected);
        assert_eq!(processor.pending(), 2);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
