//! Append-only query history

use crate::error::{LearningError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// One query attempt, success or failure. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// User identifier, opaque to the core
    pub user_id: String,

    /// Role label, opaque to the core
    pub user_role: String,

    /// Natural language question as asked
    pub question: String,

    /// Generated SQL, absent when translation failed
    pub sql_generated: Option<String>,

    /// End-to-end execution time in milliseconds
    pub execution_time_ms: u64,

    /// Whether the query succeeded
    pub success: bool,

    /// Error message for failed attempts
    pub error_message: Option<String>,

    /// Rows returned
    pub row_count: u64,

    /// Conversation session identifier, if any
    pub session_id: Option<String>,

    /// When the attempt happened
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    /// New successful record stamped with the current time; optional fields
    /// start empty
    pub fn new(
        user_id: impl Into<String>,
        user_role: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_role: user_role.into(),
            question: question.into(),
            sql_generated: None,
            execution_time_ms: 0,
            success: true,
            error_message: None,
            row_count: 0,
            session_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the generated SQL
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql_generated = Some(sql.into());
        self
    }

    /// Set the execution time
    pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    /// Set the number of rows returned
    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = row_count;
        self
    }

    /// Attach the conversation session identifier
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Mark the attempt as failed with an error message
    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(error_message.into());
        self
    }
}

/// Append-only log of every query attempt
///
/// Appends are unordered and cheap: a short critical section around a plain
/// vector push. Records are never updated or deleted; retention is an
/// external policy.
pub struct HistoryLog {
    records: Mutex<Vec<HistoryRecord>>,
}

impl HistoryLog {
    /// Create an empty history log
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Append a record. Well-formed content always succeeds; only missing
    /// identity fields are rejected, before any mutation.
    pub fn record(&self, record: HistoryRecord) -> Result<()> {
        if record.user_id.is_empty() {
            return Err(LearningError::InvalidInput("empty user_id".to_string()));
        }
        if record.user_role.is_empty() {
            return Err(LearningError::InvalidInput("empty user_role".to_string()));
        }
        if record.question.is_empty() {
            return Err(LearningError::InvalidInput("empty question".to_string()));
        }

        debug!("History append for user {}", record.user_id);
        self.lock().push(record);
        Ok(())
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the log holds no records
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Most frequently asked *successful* questions for a role, most common
    /// first. Ties break alphabetically for a stable order.
    pub fn top_questions(&self, user_role: &str, limit: usize) -> Vec<String> {
        let records = self.lock();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in records.iter() {
            if record.success && record.user_role == user_role {
                *counts.entry(record.question.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(question, _)| question.to_string())
            .collect()
    }

    /// Snapshot all records, e.g. for external persistence or reporting
    pub fn snapshot(&self) -> Vec<HistoryRecord> {
        self.lock().clone()
    }

    // A poisoned lock still yields the data: appends are single pushes and
    // cannot leave a record half-written.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HistoryRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_append() {
        let log = HistoryLog::new();

        let record = HistoryRecord::new("u-1", "analyst", "show open orders")
            .with_sql("SELECT * FROM orders WHERE status = 'open'")
            .with_execution_time(120)
            .with_row_count(42)
            .with_session("s-9");

        log.record(record).unwrap();
        assert_eq!(log.len(), 1);

        let stored = &log.snapshot()[0];
        assert!(stored.success);
        assert_eq!(stored.row_count, 42);
        assert_eq!(stored.session_id.as_deref(), Some("s-9"));
    }

    #[test]
    fn test_failed_record() {
        let log = HistoryLog::new();

        log.record(
            HistoryRecord::new("u-1", "analyst", "broken question").failed("translation failed"),
        )
        .unwrap();

        let stored = &log.snapshot()[0];
        assert!(!stored.success);
        assert_eq!(stored.error_message.as_deref(), Some("translation failed"));
        assert!(stored.sql_generated.is_none());
    }

    #[test]
    fn test_record_rejects_missing_identity() {
        let log = HistoryLog::new();

        assert!(log.record(HistoryRecord::new("", "analyst", "q")).is_err());
        assert!(log.record(HistoryRecord::new("u-1", "", "q")).is_err());
        assert!(log.record(HistoryRecord::new("u-1", "analyst", "")).is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn test_top_questions_ranks_by_frequency() {
        let log = HistoryLog::new();

        for _ in 0..3 {
            log.record(HistoryRecord::new("u-1", "analyst", "daily sales"))
                .unwrap();
        }
        for _ in 0..2 {
            log.record(HistoryRecord::new("u-2", "analyst", "open orders"))
                .unwrap();
        }
        log.record(HistoryRecord::new("u-1", "analyst", "slow queries"))
            .unwrap();
        // failures and other roles are excluded
        log.record(HistoryRecord::new("u-1", "analyst", "bad question").failed("boom"))
            .unwrap();
        log.record(HistoryRecord::new("u-3", "admin", "user activity"))
            .unwrap();

        let top = log.top_questions("analyst", 2);
        assert_eq!(top, vec!["daily sales".to_string(), "open orders".to_string()]);

        let all = log.top_questions("analyst", 10);
        assert_eq!(all.len(), 3);
        assert!(!all.contains(&"bad question".to_string()));
    }

    #[test]
    fn test_concurrent_appends() {
        use std::sync::Arc;

        let log = Arc::new(HistoryLog::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let log = Arc::clone(&log);
            handles.push(std::thread::spawn(move || {
                for j in 0..50 {
                    log.record(HistoryRecord::new(
                        format!("u-{i}"),
                        "analyst",
                        format!("question {j}"),
                    ))
                    .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.len(), 400);
    }
}
