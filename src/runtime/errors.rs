//! Structured records of failed turns
//!
//! Every turn that ends in an unhandled error or panic leaves a record here.
//! The id is also sent to the user so support can find the record later.

use crate::workflow::WorkflowState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub error_id: String,
    pub user_id: String,
    /// State the session was in when the turn failed
    pub state: WorkflowState,
    pub message: String,
    /// The inbound text that triggered the failure
    pub input: String,
    pub context: Value,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        user_id: &str,
        state: WorkflowState,
        message: impl Into<String>,
        input: &str,
        context: Value,
    ) -> Self {
        let occurred_at = Utc::now();
        Self {
            error_id: error_id(user_id, occurred_at),
            user_id: user_id.to_string(),
            state,
            message: message.into(),
            input: input.to_string(),
            context,
            occurred_at,
        }
    }
}

/// `<last 6 chars of user id>_<YYYYmmdd_HHMMSS>_<8 hex chars>`
fn error_id(user_id: &str, at: DateTime<Utc>) -> String {
    let chars: Vec<char> = user_id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(6)..].iter().collect();
    let nonce: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{tail}_{}_{}", at.format("%Y%m%d_%H%M%S"), nonce)
}

/// Bounded, newest-last log of error records
pub struct ErrorLog {
    records: Mutex<VecDeque<ErrorRecord>>,
    capacity: usize,
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ErrorRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a record, evicting the oldest when full
    pub fn record(&self, record: ErrorRecord) {
        let mut records = self.lock();
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    pub fn get(&self, error_id: &str) -> Option<ErrorRecord> {
        self.lock()
            .iter()
            .find(|r| r.error_id == error_id)
            .cloned()
    }

    /// Up to `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Vec<ErrorRecord> {
        self.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(user: &str, message: &str) -> ErrorRecord {
        ErrorRecord::new(user, WorkflowState::CaptionInput, message, "hello", Value::Null)
    }

    #[test]
    fn error_ids_carry_user_tail_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 13, 4, 5).unwrap();
        let id = error_id("15551234567", at);
        assert!(id.starts_with("234567_20240501_130405_"), "{id}");
        assert_eq!(id.len(), "234567_20240501_130405_".len() + 8);

        let short = error_id("42", at);
        assert!(short.starts_with("42_20240501_130405_"), "{short}");
    }

    #[test]
    fn records_are_retrievable_by_id() {
        let log = ErrorLog::new(10);
        let r = record("u1", "boom");
        let id = r.error_id.clone();
        log.record(r);
        let found = log.get(&id).unwrap();
        assert_eq!(found.message, "boom");
        assert_eq!(found.state, WorkflowState::CaptionInput);
        assert!(log.get("missing").is_none());
    }

    #[test]
    fn log_is_bounded_and_recent_is_newest_first() {
        let log = ErrorLog::new(2);
        log.record(record("u1", "first"));
        log.record(record("u1", "second"));
        log.record(record("u1", "third"));
        assert_eq!(log.count(), 2);
        let messages: Vec<String> = log.recent(10).into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["third", "second"]);
        assert_eq!(log.recent(1).len(), 1);
    }
}
