//! Role/intent usage pattern aggregation

use crate::error::{LearningError, Result};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Aggregated usage for one (role, intent) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPattern {
    /// Role label the pattern belongs to
    pub user_role: String,

    /// Caller-supplied label summarizing query purpose
    pub intent: String,

    /// Caller-supplied descriptive template, opaque to the core
    pub pattern_template: Option<String>,

    /// Caller-supplied parameter description, opaque to the core
    pub common_parameters: Option<String>,

    /// Number of observations folded in
    pub frequency: u64,

    /// Running mean of execution times
    pub avg_execution_time_ms: f64,

    /// Fraction of successful observations, in [0, 1]
    pub success_rate: f64,

    /// When the pattern was last observed
    pub last_used: DateTime<Utc>,

    /// When the pattern was first observed
    pub created_at: DateTime<Utc>,
}

/// Learns per-(role, intent) usage patterns from observed query outcomes
///
/// Updates to the same pair serialize on the pair's own map entry; distinct
/// pairs never contend. Patterns are created on first observation and never
/// deleted.
pub struct PatternLearner {
    patterns: DashMap<(String, String), QueryPattern>,
}

impl PatternLearner {
    /// Create an empty pattern learner
    pub fn new() -> Self {
        Self {
            patterns: DashMap::new(),
        }
    }

    /// Fold one observation into the (role, intent) pattern
    pub fn observe(
        &self,
        user_role: &str,
        intent: &str,
        success: bool,
        execution_time_ms: u64,
    ) -> Result<()> {
        self.observe_described(user_role, intent, None, None, success, execution_time_ms)
    }

    /// Like [`observe`](Self::observe), additionally attaching the caller's
    /// descriptive payloads. The latest supplied description wins.
    pub fn observe_described(
        &self,
        user_role: &str,
        intent: &str,
        pattern_template: Option<&str>,
        common_parameters: Option<&str>,
        success: bool,
        execution_time_ms: u64,
    ) -> Result<()> {
        if user_role.is_empty() {
            return Err(LearningError::InvalidInput("empty user_role".to_string()));
        }
        if intent.is_empty() {
            return Err(LearningError::InvalidInput("empty intent".to_string()));
        }

        let key = (user_role.to_string(), intent.to_string());
        match self.patterns.entry(key) {
            Entry::Occupied(mut occupied) => {
                let pattern = occupied.get_mut();
                // running mean weighted by the pre-update frequency
                let weight = pattern.frequency as f64;
                pattern.avg_execution_time_ms = (pattern.avg_execution_time_ms * weight
                    + execution_time_ms as f64)
                    / (weight + 1.0);
                pattern.success_rate =
                    (pattern.success_rate * weight + if success { 1.0 } else { 0.0 })
                        / (weight + 1.0);
                pattern.frequency += 1;
                pattern.last_used = Utc::now();
                if let Some(template) = pattern_template {
                    pattern.pattern_template = Some(template.to_string());
                }
                if let Some(parameters) = common_parameters {
                    pattern.common_parameters = Some(parameters.to_string());
                }
            }
            Entry::Vacant(vacant) => {
                debug!("New query pattern: ({}, {})", user_role, intent);
                let now = Utc::now();
                vacant.insert(QueryPattern {
                    user_role: user_role.to_string(),
                    intent: intent.to_string(),
                    pattern_template: pattern_template.map(str::to_string),
                    common_parameters: common_parameters.map(str::to_string),
                    frequency: 1,
                    avg_execution_time_ms: execution_time_ms as f64,
                    success_rate: if success { 1.0 } else { 0.0 },
                    last_used: now,
                    created_at: now,
                });
            }
        }

        Ok(())
    }

    /// Fetch one pattern
    pub fn get(&self, user_role: &str, intent: &str) -> Option<QueryPattern> {
        self.patterns
            .get(&(user_role.to_string(), intent.to_string()))
            .map(|pattern| pattern.clone())
    }

    /// All patterns for a role, most frequent first
    pub fn for_role(&self, user_role: &str) -> Vec<QueryPattern> {
        let mut patterns: Vec<QueryPattern> = self
            .patterns
            .iter()
            .filter(|entry| entry.user_role == user_role)
            .map(|entry| entry.clone())
            .collect();
        patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.intent.cmp(&b.intent)));
        patterns
    }

    /// Number of distinct (role, intent) pairs observed
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if nothing has been observed yet
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Snapshot all patterns, e.g. for external persistence or reporting
    pub fn snapshot(&self) -> Vec<QueryPattern> {
        self.patterns.iter().map(|entry| entry.clone()).collect()
    }
}

impl Default for PatternLearner {
    fn default() -> Self {
        Self::new()
    }
}
