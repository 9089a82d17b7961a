//! Daily cache hit-rate rollups

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// One day's cache outcome counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCacheStat {
    /// Calendar day the counters belong to
    pub date: NaiveDate,

    /// Lookup outcomes recorded this day
    pub total_queries: u64,

    /// Lookups answered from the cache
    pub cache_hits: u64,

    /// Lookups that went to the database
    pub cache_misses: u64,

    /// Running mean of response times
    pub avg_response_time_ms: f64,
}

impl DailyCacheStat {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_queries: 0,
            cache_hits: 0,
            cache_misses: 0,
            avg_response_time_ms: 0.0,
        }
    }

    /// Hit rate percentage; `None` until the day has any queries. Computed
    /// on read, never stored.
    pub fn hit_rate(&self) -> Option<f64> {
        if self.total_queries == 0 {
            None
        } else {
            Some(self.cache_hits as f64 / self.total_queries as f64 * 100.0)
        }
    }
}

/// Rolls per-lookup outcomes into per-day statistics
///
/// Only one day key is hot at a time; the fold is a short critical section
/// on that day's entry. Past days are never written again.
pub struct StatsRoller {
    days: DashMap<NaiveDate, DailyCacheStat>,
}

impl StatsRoller {
    /// Create an empty roller
    pub fn new() -> Self {
        Self {
            days: DashMap::new(),
        }
    }

    /// Record one lookup outcome against today (wall clock)
    pub fn record_outcome(&self, hit: bool, response_time_ms: u64) {
        self.record_outcome_at(hit, response_time_ms, Utc::now());
    }

    /// Record one lookup outcome against the day of `now`. Only that day's
    /// counters are touched.
    pub fn record_outcome_at(&self, hit: bool, response_time_ms: u64, now: DateTime<Utc>) {
        let date = now.date_naive();
        let mut day = self.days.entry(date).or_insert_with(|| DailyCacheStat::new(date));

        // running mean weighted by the pre-update total
        let weight = day.total_queries as f64;
        day.avg_response_time_ms =
            (day.avg_response_time_ms * weight + response_time_ms as f64) / (weight + 1.0);
        day.total_queries += 1;
        if hit {
            day.cache_hits += 1;
        } else {
            day.cache_misses += 1;
        }
    }

    /// Today's counters, if there was any activity today
    pub fn today(&self) -> Option<DailyCacheStat> {
        self.for_date(Utc::now().date_naive())
    }

    /// Counters for a specific day, if that day saw any activity
    pub fn for_date(&self, date: NaiveDate) -> Option<DailyCacheStat> {
        self.days.get(&date).map(|day| day.clone())
    }

    /// All recorded days, oldest first
    pub fn snapshot(&self) -> Vec<DailyCacheStat> {
        let mut days: Vec<DailyCacheStat> = self.days.iter().map(|day| day.clone()).collect();
        days.sort_by_key(|day| day.date);
        days
    }
}

impl Default for StatsRoller {
    fn default() -> Self {
        Self::new()
    }
}
