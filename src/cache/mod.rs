//! # Content-Addressed Result Caching
//!
//! TTL-based caching of translated query results, keyed by question
//! fingerprint.
//!
//! ## Features
//!
//! - **TTL-Based Liveness**: every hit-eligible access restarts the entry's
//!   liveness window; expired entries are never returned
//! - **Hit Accounting**: per-entry hit counters, reset whenever the payload
//!   is overwritten, plus process-lifetime store counters
//! - **Per-Key Atomicity**: lookups touch, stores upsert, and evictions
//!   remove under the key's own lock; different keys never contend
//! - **Background Sweeping**: a timer-driven sweeper evicts expired entries
//!   with a clean start/stop lifecycle
//!
//! ## Example
//!
//! ```rust
//! use query_learning::cache::CacheStore;
//!
//! # fn example() -> anyhow::Result<()> {
//! let store = CacheStore::new();
//!
//! store.store("fp:123", "show open orders", "SELECT * FROM orders", "[]", 60)?;
//!
//! if let Some(entry) = store.lookup("fp:123")? {
//!     println!("cache hit after {} earlier hits", entry.hit_count - 1);
//! }
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod store;
pub mod sweeper;

pub use entry::CacheEntry;
pub use store::{CacheStats, CacheStore};
pub use sweeper::{ExpirySweeper, SweeperHandle};
