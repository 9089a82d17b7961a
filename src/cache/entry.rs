//! Cache entry management with TTL liveness

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached answer keyed by question fingerprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content-derived key for the normalized question
    pub fingerprint: String,

    /// Original question text, kept for diagnostics
    pub question: String,

    /// The SQL string that produced the cached result
    pub sql_query: String,

    /// Serialized result set; opaque to the cache
    pub result_payload: String,

    /// When the entry was first created
    pub created_at: DateTime<Utc>,

    /// Last hit-eligible access; the liveness window is measured from here
    pub last_accessed_at: DateTime<Utc>,

    /// Liveness window in minutes
    pub ttl_minutes: i64,

    /// Hits since the payload was last written
    pub hit_count: u64,
}

impl CacheEntry {
    /// Create a new entry; hit accounting starts at zero
    pub fn new(
        fingerprint: String,
        question: String,
        sql_query: String,
        result_payload: String,
        ttl_minutes: i64,
    ) -> Self {
        let now = Utc::now();

        Self {
            fingerprint,
            question,
            sql_query,
            result_payload,
            created_at: now,
            last_accessed_at: now,
            ttl_minutes,
            hit_count: 0,
        }
    }

    /// Expiry instant, derived from the last access. Never stored.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.last_accessed_at + Duration::minutes(self.ttl_minutes)
    }

    /// Liveness at a given instant. The boundary is inclusive: an entry is
    /// still live exactly at its expiry instant.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at()
    }

    /// Check liveness against the wall clock
    pub fn is_live(&self) -> bool {
        self.is_live_at(Utc::now())
    }

    /// Record a live hit: bump the hit counter and restart the liveness
    /// window from now.
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
        self.hit_count += 1;
    }

    /// Replace the cached content in place. Hit accounting restarts with
    /// the new payload generation.
    pub fn refresh(&mut self, sql_query: String, result_payload: String, ttl_minutes: i64) {
        self.sql_query = sql_query;
        self.result_payload = result_payload;
        self.ttl_minutes = ttl_minutes;
        self.last_accessed_at = Utc::now();
        self.hit_count = 0;
    }
}
