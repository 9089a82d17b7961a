//! Per-query-shape performance tracking and slow-query flagging

use crate::error::{LearningError, Result};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Operator-facing optimization state; never transitioned by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptimizationStatus {
    /// No optimization attention needed or given
    Normal,

    /// Marked slow by an operator
    Slow,

    /// Optimized by an operator
    Optimized,
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationStatus::Normal => write!(f, "normal"),
            OptimizationStatus::Slow => write!(f, "slow"),
            OptimizationStatus::Optimized => write!(f, "optimized"),
        }
    }
}

/// Execution-time statistics for one query fingerprint
///
/// Shares the cache's key space but lives independently: stats survive
/// cache eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStat {
    /// Fingerprint of the query shape
    pub fingerprint: String,

    /// Running mean of execution times
    pub avg_time_ms: f64,

    /// Fastest observed execution
    pub min_time_ms: u64,

    /// Slowest observed execution
    pub max_time_ms: u64,

    /// Number of executions folded in
    pub execution_count: u64,

    /// When the fingerprint last executed
    pub last_execution: DateTime<Utc>,

    /// Operator-managed optimization state
    pub optimization_status: OptimizationStatus,

    /// Sticky flag raised when an execution exceeds the slow threshold;
    /// cleared only by an explicit operator reset
    pub needs_review: bool,
}

/// Aggregates execution times per fingerprint and flags slow queries
pub struct PerformanceMonitor {
    stats: DashMap<String, PerformanceStat>,
    slow_threshold_ms: u64,
}

impl PerformanceMonitor {
    /// Create a monitor with the given slow-query threshold
    pub fn new(slow_threshold_ms: u64) -> Self {
        Self {
            stats: DashMap::new(),
            slow_threshold_ms,
        }
    }

    /// Fold one execution into the fingerprint's statistics
    pub fn record(&self, fingerprint: &str, execution_time_ms: u64) -> Result<()> {
        if fingerprint.is_empty() {
            return Err(LearningError::InvalidInput("empty fingerprint".to_string()));
        }

        let slow = execution_time_ms > self.slow_threshold_ms;
        if slow {
            warn!(
                "Execution of {} took {} ms (threshold {} ms), flagging for review",
                fingerprint, execution_time_ms, self.slow_threshold_ms
            );
        }

        match self.stats.entry(fingerprint.to_string()) {
            Entry::Occupied(mut occupied) => {
                let stat = occupied.get_mut();
                // running mean weighted by the pre-update count
                let weight = stat.execution_count as f64;
                stat.avg_time_ms =
                    (stat.avg_time_ms * weight + execution_time_ms as f64) / (weight + 1.0);
                stat.min_time_ms = stat.min_time_ms.min(execution_time_ms);
                stat.max_time_ms = stat.max_time_ms.max(execution_time_ms);
                stat.execution_count += 1;
                stat.last_execution = Utc::now();
                stat.needs_review = stat.needs_review || slow;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(PerformanceStat {
                    fingerprint: fingerprint.to_string(),
                    avg_time_ms: execution_time_ms as f64,
                    min_time_ms: execution_time_ms,
                    max_time_ms: execution_time_ms,
                    execution_count: 1,
                    last_execution: Utc::now(),
                    optimization_status: OptimizationStatus::Normal,
                    needs_review: slow,
                });
            }
        }

        Ok(())
    }

    /// Operator override of the optimization status. Returns whether the
    /// fingerprint was known.
    pub fn set_status(&self, fingerprint: &str, status: OptimizationStatus) -> bool {
        match self.stats.get_mut(fingerprint) {
            Some(mut stat) => {
                stat.optimization_status = status;
                true
            }
            None => false,
        }
    }

    /// Operator reset of the sticky review flag. Returns whether the
    /// fingerprint was known.
    pub fn reset_review(&self, fingerprint: &str) -> bool {
        match self.stats.get_mut(fingerprint) {
            Some(mut stat) => {
                stat.needs_review = false;
                true
            }
            None => false,
        }
    }

    /// Fetch one fingerprint's statistics
    pub fn get(&self, fingerprint: &str) -> Option<PerformanceStat> {
        self.stats.get(fingerprint).map(|stat| stat.clone())
    }

    /// All statistics currently flagged for review
    pub fn needing_review(&self) -> Vec<PerformanceStat> {
        self.stats
            .iter()
            .filter(|entry| entry.needs_review)
            .map(|entry| entry.clone())
            .collect()
    }

    /// Number of fingerprints tracked
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Check if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Snapshot all statistics, e.g. for external persistence or reporting
    pub fn snapshot(&self) -> Vec<PerformanceStat> {
        self.stats.iter().map(|entry| entry.clone()).collect()
    }
}
