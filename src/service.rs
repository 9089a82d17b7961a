//! High-level query learning facade
//!
//! Wires the cache store, history log, pattern learner, performance monitor,
//! and daily statistics behind a question-level API for the gateway. The
//! component stores stay public: callers that need a single contract (say,
//! an operator dashboard reading flagged queries) reach it directly.

use crate::cache::{CacheEntry, CacheStore, ExpirySweeper, SweeperHandle};
use crate::config::LearningConfig;
use crate::error::{LearningError, Result};
use crate::fingerprint::{fingerprint, normalize};
use crate::learning::{
    DailyCacheStat, HistoryLog, HistoryRecord, PatternLearner, PerformanceMonitor, StatsRoller,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// A cache hit as returned to the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAnswer {
    /// Fingerprint the answer is stored under
    pub fingerprint: String,

    /// Question text the entry was created with
    pub question: String,

    /// SQL that produced the cached result
    pub sql_query: String,

    /// Serialized result set
    pub result_payload: String,

    /// Hits since the payload was last written, including this one
    pub hit_count: u64,
}

impl From<CacheEntry> for CachedAnswer {
    fn from(entry: CacheEntry) -> Self {
        Self {
            fingerprint: entry.fingerprint,
            question: entry.question,
            sql_query: entry.sql_query,
            result_payload: entry.result_payload,
            hit_count: entry.hit_count,
        }
    }
}

/// Everything the gateway knows after running a fresh (uncached) query
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// User identifier, opaque to the core
    pub user_id: String,

    /// Role label, opaque to the core
    pub user_role: String,

    /// Short label summarizing query purpose, for pattern grouping
    pub intent: String,

    /// Natural language question as asked
    pub question: String,

    /// Generated SQL, absent when translation failed
    pub sql_generated: Option<String>,

    /// Serialized result set to cache; only successful outcomes with a
    /// payload and SQL are cached
    pub result_payload: Option<String>,

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

    /// Liveness override for this answer; the configured default applies
    /// when absent
    pub ttl_minutes: Option<i64>,
}

impl QueryOutcome {
    /// Successful outcome; attach optional fields with the `with_` methods
    pub fn success(
        user_id: impl Into<String>,
        user_role: impl Into<String>,
        intent: impl Into<String>,
        question: impl Into<String>,
        sql_generated: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_role: user_role.into(),
            intent: intent.into(),
            question: question.into(),
            sql_generated: Some(sql_generated.into()),
            result_payload: None,
            execution_time_ms,
            success: true,
            error_message: None,
            row_count: 0,
            session_id: None,
            ttl_minutes: None,
        }
    }

    /// Failed outcome; nothing is cached for failures
    pub fn failure(
        user_id: impl Into<String>,
        user_role: impl Into<String>,
        intent: impl Into<String>,
        question: impl Into<String>,
        error_message: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_role: user_role.into(),
            intent: intent.into(),
            question: question.into(),
            sql_generated: None,
            result_payload: None,
            execution_time_ms,
            success: false,
            error_message: Some(error_message.into()),
            row_count: 0,
            session_id: None,
            ttl_minutes: None,
        }
    }

    /// Attach an already-serialized result payload
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.result_payload = Some(payload.into());
        self
    }

    /// Serialize result rows to JSON as the cached payload
    pub fn with_payload_json<T: Serialize>(mut self, rows: &T) -> Result<Self> {
        let payload = serde_json::to_string(rows)
            .map_err(|e| LearningError::Serialization(e.to_string()))?;
        self.result_payload = Some(payload);
        Ok(self)
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

    /// Override the cache TTL for this answer
    pub fn with_ttl_minutes(mut self, ttl_minutes: i64) -> Self {
        self.ttl_minutes = Some(ttl_minutes);
        self
    }
}

/// Facade over the whole learning core
///
/// One instance owns all five stores. Request handling consults
/// [`lookup`](Self::lookup) first; on a miss, the gateway obtains fresh data
/// externally and reports back via [`record_result`](Self::record_result).
pub struct QueryLearning {
    config: LearningConfig,

    /// Cached answers keyed by question fingerprint
    pub cache: Arc<CacheStore>,

    /// Append-only record of every query attempt
    pub history: Arc<HistoryLog>,

    /// Per-(role, intent) usage patterns
    pub patterns: Arc<PatternLearner>,

    /// Per-fingerprint execution statistics
    pub performance: Arc<PerformanceMonitor>,

    /// Daily hit/miss rollups
    pub stats: Arc<StatsRoller>,
}

impl QueryLearning {
    /// Create the core with the given configuration
    pub fn new(config: LearningConfig) -> Result<Self> {
        config.validate()?;
        info!("Initializing query learning core: {:?}", config);

        Ok(Self {
            cache: Arc::new(CacheStore::new()),
            history: Arc::new(HistoryLog::new()),
            patterns: Arc::new(PatternLearner::new()),
            performance: Arc::new(PerformanceMonitor::new(config.slow_query_threshold_ms)),
            stats: Arc::new(StatsRoller::new()),
            config,
        })
    }

    /// The configuration the core was built with
    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Consult the cache for a question.
    ///
    /// A hit bumps the entry's hit accounting and rolls into today's
    /// statistics. A miss records nothing: the caller reports the fresh
    /// result later via [`record_result`](Self::record_result).
    pub fn lookup(&self, question: &str) -> Result<Option<CachedAnswer>> {
        let started = Instant::now();

        let normalized = normalize(question);
        if normalized.is_empty() {
            return Err(LearningError::InvalidInput("empty question".to_string()));
        }

        let key = fingerprint(&normalized);
        match self.cache.lookup(&key)? {
            Some(entry) => {
                self.stats
                    .record_outcome(true, started.elapsed().as_millis() as u64);
                Ok(Some(entry.into()))
            }
            None => Ok(None),
        }
    }

    /// Cache an answer for a question without touching the learning stores.
    ///
    /// Fingerprints internally and upserts; the configured default TTL
    /// applies when `ttl_minutes` is `None`. Returns the fingerprint.
    /// Most callers want [`record_result`](Self::record_result), which also
    /// feeds history, patterns, performance, and daily statistics.
    pub fn store(
        &self,
        question: &str,
        sql_query: &str,
        result_payload: &str,
        ttl_minutes: Option<i64>,
    ) -> Result<String> {
        let normalized = normalize(question);
        if normalized.is_empty() {
            return Err(LearningError::InvalidInput("empty question".to_string()));
        }

        let key = fingerprint(&normalized);
        let ttl = ttl_minutes.unwrap_or(self.config.default_ttl_minutes);
        self.cache.store(&key, question, sql_query, result_payload, ttl)?;
        Ok(key)
    }

    /// Write-through for a fresh query outcome.
    ///
    /// Caches the answer (successful outcomes carrying SQL and a payload),
    /// appends history, folds the (role, intent) pattern, updates the
    /// fingerprint's performance statistics, and rolls a miss into today's
    /// counters. The side stores are independent: a failure in one is
    /// logged as an inconsistency and does not roll back the others.
    /// Returns the question fingerprint.
    pub fn record_result(&self, outcome: QueryOutcome) -> Result<String> {
        // reject malformed input before any store is touched
        let normalized = normalize(&outcome.question);
        if normalized.is_empty() {
            return Err(LearningError::InvalidInput("empty question".to_string()));
        }
        if outcome.user_id.is_empty() {
            return Err(LearningError::InvalidInput("empty user_id".to_string()));
        }
        if outcome.user_role.is_empty() {
            return Err(LearningError::InvalidInput("empty user_role".to_string()));
        }
        if outcome.intent.is_empty() {
            return Err(LearningError::InvalidInput("empty intent".to_string()));
        }
        if let Some(ttl) = outcome.ttl_minutes {
            if ttl < 1 {
                return Err(LearningError::InvalidInput(format!(
                    "ttl_minutes must be at least 1, got {ttl}"
                )));
            }
        }

        let key = fingerprint(&normalized);

        if outcome.success {
            if let (Some(sql), Some(payload)) = (&outcome.sql_generated, &outcome.result_payload) {
                let ttl = outcome.ttl_minutes.unwrap_or(self.config.default_ttl_minutes);
                if let Err(e) = self.cache.store(&key, &outcome.question, sql, payload, ttl) {
                    warn!("Cache store failed for {}: {}", key, e);
                }
            }
        }

        if let Err(e) = self.patterns.observe(
            &outcome.user_role,
            &outcome.intent,
            outcome.success,
            outcome.execution_time_ms,
        ) {
            warn!("Pattern observation failed for {}: {}", outcome.intent, e);
        }

        if let Err(e) = self.performance.record(&key, outcome.execution_time_ms) {
            warn!("Performance update failed for {}: {}", key, e);
        }

        self.stats.record_outcome(false, outcome.execution_time_ms);

        let record = HistoryRecord {
            user_id: outcome.user_id,
            user_role: outcome.user_role,
            question: outcome.question,
            sql_generated: outcome.sql_generated,
            execution_time_ms: outcome.execution_time_ms,
            success: outcome.success,
            error_message: outcome.error_message,
            row_count: outcome.row_count,
            session_id: outcome.session_id,
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = self.history.record(record) {
            warn!("History append failed for {}: {}", key, e);
        }

        Ok(key)
    }

    /// Suggested questions for a role, most frequently successful first
    pub fn suggestions(&self, user_role: &str, limit: usize) -> Vec<String> {
        self.history.top_questions(user_role, limit)
    }

    /// Today's cache statistics, if there was any activity today
    pub fn today_stats(&self) -> Option<DailyCacheStat> {
        self.stats.today()
    }

    /// Run one expiry sweep immediately; returns the number evicted
    pub fn sweep_now(&self) -> usize {
        self.cache.evict_expired()
    }

    /// Spawn the periodic expiry sweeper at the configured interval
    pub fn start_sweeper(&self) -> SweeperHandle {
        ExpirySweeper::new(Arc::clone(&self.cache), self.config.sweep_interval).start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> QueryLearning {
        QueryLearning::new(LearningConfig::default()).unwrap()
    }

    #[test]
    fn test_lookup_rejects_blank_question() {
        let core = core();
        assert!(core.lookup("   ").is_err());
    }

    #[test]
    fn test_record_result_validates_before_mutation() {
        let core = core();

        let mut outcome = QueryOutcome::success("u-1", "analyst", "orders", "q", "SELECT 1", 10);
        outcome.user_role = String::new();
        assert!(core.record_result(outcome).is_err());

        let outcome = QueryOutcome::success("u-1", "analyst", "orders", "q", "SELECT 1", 10)
            .with_ttl_minutes(0);
        assert!(core.record_result(outcome).is_err());

        assert!(core.cache.is_empty());
        assert!(core.history.is_empty());
        assert!(core.patterns.is_empty());
        assert!(core.performance.is_empty());
        assert!(core.today_stats().is_none());
    }

    #[test]
    fn test_standalone_store_skips_learning_stores() {
        let core = core();

        let key = core
            .store("Daily Sales", "SELECT 1", "[]", Some(5))
            .unwrap();

        let answer = core.lookup("daily sales").unwrap().expect("cache hit");
        assert_eq!(answer.fingerprint, key);
        assert!(core.history.is_empty());
        assert!(core.patterns.is_empty());
        assert!(core.performance.is_empty());
    }

    #[test]
    fn test_payload_json_helper() {
        let rows = vec![("a", 1), ("b", 2)];
        let outcome = QueryOutcome::success("u-1", "analyst", "orders", "q", "SELECT 1", 10)
            .with_payload_json(&rows)
            .unwrap();

        assert_eq!(
            outcome.result_payload.as_deref(),
            Some(r#"[["a",1],["b",2]]"#)
        );
    }

    #[test]
    fn test_failure_is_recorded_but_not_cached() {
        let core = core();

        core.record_result(QueryOutcome::failure(
            "u-1",
            "analyst",
            "orders",
            "bad question",
            "translation failed",
            30,
        ))
        .unwrap();

        assert!(core.cache.is_empty());
        assert_eq!(core.history.len(), 1);
        assert_eq!(
            core.patterns.get("analyst", "orders").unwrap().success_rate,
            0.0
        );
    }
}
