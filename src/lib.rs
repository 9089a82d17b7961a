//! # Query Learning
//!
//! A learning query cache for natural-language-to-SQL assistants. It sits
//! between the NL→SQL translator and the database, avoiding repeated
//! translations and round-trips for semantically identical questions while
//! building the statistics an operator needs to spot slow queries and common
//! usage patterns per role.
//!
//! ## Features
//!
//! - **Content-Addressed Caching**: answers keyed by a SHA-256 fingerprint
//!   of the normalized question, with TTL liveness and hit accounting
//! - **Query History**: append-only log of every attempt, success or failure
//! - **Pattern Learning**: per-(role, intent) frequency, running mean
//!   execution time, and rolling success rate
//! - **Performance Tracking**: per-query-shape min/max/average times with a
//!   sticky slow-query review flag
//! - **Daily Statistics**: lazily-created per-day hit-rate rollups
//! - **Expiry Sweeping**: timer-driven eviction with clean start/stop
//!
//! The core is a library: it never generates SQL, talks to a database, or
//! enforces access control. The gateway supplies outcomes; the core records
//! them.
//!
//! ## Example
//!
//! ```rust
//! use query_learning::{LearningConfig, QueryLearning, QueryOutcome};
//!
//! # fn main() -> anyhow::Result<()> {
//! let core = QueryLearning::new(LearningConfig::default())?;
//!
//! // First sighting of a question: a miss.
//! assert!(core.lookup("Which orders shipped late?")?.is_none());
//!
//! // The gateway translates and executes externally, then reports back.
//! let outcome = QueryOutcome::success(
//!     "u-17",
//!     "analyst",
//!     "orders.late",
//!     "Which orders shipped late?",
//!     "SELECT * FROM orders WHERE shipped_at > promised_at",
//!     42,
//! )
//! .with_payload(r#"[{"order_id": 9}]"#)
//! .with_row_count(1);
//! core.record_result(outcome)?;
//!
//! // The same question (modulo case) now hits.
//! let answer = core.lookup("which orders shipped late?")?.expect("cache hit");
//! assert_eq!(answer.result_payload, r#"[{"order_id": 9}]"#);
//! # Ok(())
//! # }
//! ```
//!
//! ## Background sweeping
//!
//! ```rust,no_run
//! use query_learning::{LearningConfig, QueryLearning};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let core = QueryLearning::new(LearningConfig::from_env()?)?;
//!
//! let sweeper = core.start_sweeper();
//! // ... serve requests ...
//! sweeper.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod learning;
pub mod service;

// Re-export main types for convenience
pub use cache::{CacheEntry, CacheStats, CacheStore, ExpirySweeper, SweeperHandle};
pub use config::{LearningConfig, LearningConfigBuilder};
pub use error::{LearningError, Result};
pub use fingerprint::{fingerprint, normalize};
pub use learning::{
    DailyCacheStat, HistoryLog, HistoryRecord, OptimizationStatus, PatternLearner,
    PerformanceMonitor, PerformanceStat, QueryPattern, StatsRoller,
};
pub use service::{CachedAnswer, QueryLearning, QueryOutcome};
