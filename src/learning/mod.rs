//! # Query Learning Stores
//!
//! The aggregation side of the core: every fresh (uncached) query outcome is
//! folded into four independent stores.
//!
//! - [`HistoryLog`] — append-only record of every query attempt
//! - [`PatternLearner`] — per-(role, intent) usage patterns with rolling
//!   success rates
//! - [`PerformanceMonitor`] — per-fingerprint execution statistics with a
//!   sticky slow-query flag
//! - [`StatsRoller`] — daily cache hit/miss rollups
//!
//! The stores share nothing: cross-entity relationships are by key only
//! (the performance monitor reuses the cache's fingerprint key space but
//! keeps its own lifecycle).

pub mod history;
pub mod patterns;
pub mod performance;
pub mod stats;

pub use history::{HistoryLog, HistoryRecord};
pub use patterns::{PatternLearner, QueryPattern};
pub use performance::{OptimizationStatus, PerformanceMonitor, PerformanceStat};
pub use stats::{DailyCacheStat, StatsRoller};
