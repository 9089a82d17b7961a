//! Cache store with per-key atomicity, TTL liveness, and hit accounting

use crate::cache::entry::CacheEntry;
use crate::error::{LearningError, Result};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Process-lifetime counters for cache activity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of live cache hits
    pub hits: u64,

    /// Total number of misses (absent or expired entries)
    pub misses: u64,

    /// Total number of store calls (inserts and refreshes)
    pub stores: u64,

    /// Total number of entries removed by expiry eviction
    pub evictions: u64,

    /// Number of entries currently in the cache
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate percentage; `None` before any lookup happened
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        if total == 0 {
            None
        } else {
            Some(self.hits as f64 / total as f64 * 100.0)
        }
    }
}

/// Content-addressed store of cached answers
///
/// Keyed by question fingerprint. Per-key operations (lookup's touch, store,
/// eviction) are atomic; lookups of different keys do not block each other.
/// Expired entries are left in place for the sweeper rather than evicted on
/// read.
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStore {
    /// Create an empty cache store
    pub fn new() -> Self {
        info!("Initializing cache store");

        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a fingerprint, returning the entry only while it is live.
    ///
    /// A live hit atomically increments the entry's `hit_count` and restarts
    /// its liveness window. A dead-but-not-yet-swept entry reports a miss
    /// and is left untouched.
    pub fn lookup(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        if fingerprint.is_empty() {
            return Err(LearningError::InvalidInput("empty fingerprint".to_string()));
        }

        if let Some(mut entry) = self.entries.get_mut(fingerprint) {
            if entry.is_live() {
                entry.touch();
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit: {}", fingerprint);
                return Ok(Some(entry.clone()));
            }
            debug!("Cache entry expired, awaiting sweep: {}", fingerprint);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss: {}", fingerprint);
        Ok(None)
    }

    /// Upsert a cached answer.
    ///
    /// An existing entry (live or dead) has its SQL, payload, and TTL
    /// replaced and its hit accounting reset; an absent key is created. The
    /// whole upsert is atomic per key, and a fresh store always wins over a
    /// concurrent eviction of the same key.
    pub fn store(
        &self,
        fingerprint: &str,
        question: &str,
        sql_query: &str,
        result_payload: &str,
        ttl_minutes: i64,
    ) -> Result<()> {
        if fingerprint.is_empty() {
            return Err(LearningError::InvalidInput("empty fingerprint".to_string()));
        }
        if question.is_empty() {
            return Err(LearningError::InvalidInput("empty question".to_string()));
        }
        if ttl_minutes < 1 {
            return Err(LearningError::InvalidInput(format!(
                "ttl_minutes must be at least 1, got {ttl_minutes}"
            )));
        }

        match self.entries.entry(fingerprint.to_string()) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().refresh(
                    sql_query.to_string(),
                    result_payload.to_string(),
                    ttl_minutes,
                );
                debug!("Refreshed cache entry: {}", fingerprint);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(
                    fingerprint.to_string(),
                    question.to_string(),
                    sql_query.to_string(),
                    result_payload.to_string(),
                    ttl_minutes,
                ));
                debug!("Inserted new cache entry: {}", fingerprint);
            }
        }

        self.stores.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Remove all entries whose liveness window has passed; returns the
    /// number removed. Entries are checked and removed under their shard
    /// lock, so an entry refreshed by a concurrent `store` survives.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut evicted = 0;

        self.entries.retain(|_, entry| {
            let live = entry.is_live_at(now);
            if !live {
                evicted += 1;
            }
            live
        });

        if evicted > 0 {
            debug!("Evicted {} expired cache entries", evicted);
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }

        evicted
    }

    /// Explicitly purge one entry, live or dead
    pub fn remove(&self, fingerprint: &str) -> Option<CacheEntry> {
        self.entries.remove(fingerprint).map(|(_, entry)| entry)
    }

    /// Clear all entries
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        info!("Cleared {} entries from cache", count);
    }

    /// Read an entry without touching it, regardless of liveness
    pub fn peek(&self, fingerprint: &str) -> Option<CacheEntry> {
        self.entries.get(fingerprint).map(|entry| entry.clone())
    }

    /// Number of entries currently held, live or dead
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the process-lifetime counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    /// Snapshot all entries, e.g. for external persistence
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        self.entries.iter().map(|entry| entry.clone()).collect()
    }

    /// Restore entries from a snapshot, keeping their original timestamps
    /// and hit counts. Colliding fingerprints are overwritten.
    pub fn restore(&self, entries: impl IntoIterator<Item = CacheEntry>) {
        for entry in entries {
            self.entries.insert(entry.fingerprint.clone(), entry);
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn expired_entry(fingerprint: &str) -> CacheEntry {
        let mut entry = CacheEntry::new(
            fingerprint.to_string(),
            "old question".to_string(),
            "SELECT 1".to_string(),
            "[]".to_string(),
            1,
        );
        entry.last_accessed_at = Utc::now() - Duration::minutes(5);
        entry
    }

    #[test]
    fn test_store_and_lookup() {
        let store = CacheStore::new();
        store
            .store("fp-1", "show all customers", "SELECT * FROM customers", "[]", 60)
            .unwrap();

        let entry = store.lookup("fp-1").unwrap().expect("entry should be live");
        assert_eq!(entry.question, "show all customers");
        assert_eq!(entry.hit_count, 1);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_lookup_miss() {
        let store = CacheStore::new();

        assert!(store.lookup("absent").unwrap().is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_lookup_rejects_empty_fingerprint() {
        let store = CacheStore::new();
        assert!(matches!(
            store.lookup(""),
            Err(LearningError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_store_validates_input() {
        let store = CacheStore::new();

        assert!(store.store("", "q", "sql", "[]", 60).is_err());
        assert!(store.store("fp", "", "sql", "[]", 60).is_err());
        assert!(store.store("fp", "q", "sql", "[]", 0).is_err());
        assert!(store.store("fp", "q", "sql", "[]", -5).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_refresh_resets_hit_count() {
        let store = CacheStore::new();
        store.store("fp-1", "q", "SELECT 1", "[]", 60).unwrap();

        for _ in 0..50 {
            store.lookup("fp-1").unwrap();
        }
        assert_eq!(store.peek("fp-1").unwrap().hit_count, 50);

        store.store("fp-1", "q", "SELECT 2", "[2]", 60).unwrap();

        let entry = store.peek("fp-1").unwrap();
        assert_eq!(entry.hit_count, 0);
        assert_eq!(entry.sql_query, "SELECT 2");
        assert_eq!(entry.result_payload, "[2]");
    }

    #[test]
    fn test_dead_entry_reports_miss_without_mutation() {
        let store = CacheStore::new();
        store.restore([expired_entry("fp-dead")]);

        let before = store.peek("fp-dead").unwrap();
        assert!(store.lookup("fp-dead").unwrap().is_none());
        let after = store.peek("fp-dead").unwrap();

        assert_eq!(before.hit_count, after.hit_count);
        assert_eq!(before.last_accessed_at, after.last_accessed_at);
        assert_eq!(store.stats().misses, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_revives_dead_entry() {
        let store = CacheStore::new();
        store.restore([expired_entry("fp-1")]);

        store
            .store("fp-1", "old question", "SELECT 2", "[2]", 60)
            .unwrap();

        let entry = store.lookup("fp-1").unwrap().expect("refreshed entry is live");
        assert_eq!(entry.sql_query, "SELECT 2");
    }

    #[test]
    fn test_evict_expired_is_idempotent() {
        let store = CacheStore::new();
        store.restore([expired_entry("fp-1"), expired_entry("fp-2")]);
        store.store("fp-3", "q", "SELECT 3", "[]", 60).unwrap();

        assert_eq!(store.evict_expired(), 2);
        assert_eq!(store.evict_expired(), 0);
        assert_eq!(store.len(), 1);
        assert!(store.peek("fp-3").is_some());
        assert_eq!(store.stats().evictions, 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = CacheStore::new();
        store.store("fp-1", "q1", "SELECT 1", "[]", 60).unwrap();
        store.store("fp-2", "q2", "SELECT 2", "[]", 60).unwrap();

        let removed = store.remove("fp-1").expect("entry existed");
        assert_eq!(removed.question, "q1");
        assert!(store.remove("fp-1").is_none());

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_stats_hit_rate_guard() {
        let store = CacheStore::new();
        assert!(store.stats().hit_rate().is_none());

        store.store("fp-1", "q", "SELECT 1", "[]", 60).unwrap();
        store.lookup("fp-1").unwrap();
        store.lookup("absent").unwrap();

        let rate = store.stats().hit_rate().unwrap();
        assert!((rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_stores_single_winner() {
        use std::sync::Arc;

        let store = Arc::new(CacheStore::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let sql = format!("SELECT {i}");
                let payload = format!("[{i}]");
                store.store("fp-hot", "question", &sql, &payload, 60).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let entry = store.peek("fp-hot").unwrap();
        let winner: usize = entry.sql_query.trim_start_matches("SELECT ").parse().unwrap();
        assert_eq!(entry.result_payload, format!("[{winner}]"));
        assert_eq!(store.len(), 1);
    }
}
