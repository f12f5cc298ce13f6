//! Service Metrics
//!
//! Lookup counters and latency tracking.

use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// How a lookup was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the per-query memo tier
    MemoHit,
    /// Row taken from a precomputed bulk result
    BulkHit,
    /// Distances computed on demand
    Lazy,
    /// Query vector was the all-zero vector
    OutOfVocabulary,
}

/// Metrics collector
#[derive(Debug)]
pub struct ServiceStats {
    queries: AtomicU64,
    memo_hits: AtomicU64,
    bulk_hits: AtomicU64,
    lazy_computations: AtomicU64,
    oov_queries: AtomicU64,

    /// Completed bulk builds per backend name
    bulk_builds: RwLock<HashMap<String, u64>>,

    latency_sum_us: AtomicU64,
    latency_count: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceStats {
    /// Create new stats collector
    pub fn new() -> Self {
        Self {
            queries: AtomicU64::new(0),
            memo_hits: AtomicU64::new(0),
            bulk_hits: AtomicU64::new(0),
            lazy_computations: AtomicU64::new(0),
            oov_queries: AtomicU64::new(0),
            bulk_builds: RwLock::new(HashMap::new()),
            latency_sum_us: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(u64::MAX),
            latency_max_us: AtomicU64::new(0),
        }
    }

    /// Record one answered lookup
    pub fn record_query(&self, outcome: Outcome, latency: Duration) {
        // Increment total lookups
        self.queries.fetch_add(1, Ordering::Relaxed);

        // Increment the outcome counter
        let counter = match outcome {
            Outcome::MemoHit => &self.memo_hits,
            Outcome::BulkHit => &self.bulk_hits,
            Outcome::Lazy => &self.lazy_computations,
            Outcome::OutOfVocabulary => &self.oov_queries,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        // Record latency
        let latency_us = latency.as_micros() as u64;
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        // Update min/max
        self.latency_min_us.fetch_min(latency_us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    /// Record a finished bulk precompute
    pub fn record_bulk_build(&self, backend: &str) {
        let mut builds = self.bulk_builds.write();
        *builds.entry(backend.to_string()).or_insert(0) += 1;
    }

    /// Get total lookups
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Get lookups served from the memo tier
    pub fn memo_hits(&self) -> u64 {
        self.memo_hits.load(Ordering::Relaxed)
    }

    /// Get lookups served from a bulk result
    pub fn bulk_hits(&self) -> u64 {
        self.bulk_hits.load(Ordering::Relaxed)
    }

    /// Get lookups computed on demand
    pub fn lazy_computations(&self) -> u64 {
        self.lazy_computations.load(Ordering::Relaxed)
    }

    /// Get out-of-vocabulary lookups
    pub fn oov_queries(&self) -> u64 {
        self.oov_queries.load(Ordering::Relaxed)
    }

    /// Bulk builds grouped by backend
    pub fn bulk_builds(&self) -> HashMap<String, u64> {
        self.bulk_builds.read().clone()
    }

    /// Get bulk builds across all backends
    pub fn total_bulk_builds(&self) -> u64 {
        self.bulk_builds.read().values().sum()
    }

    /// Get average latency in microseconds
    pub fn avg_latency_us(&self) -> f64 {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        sum as f64 / count as f64
    }

    /// Get minimum latency in microseconds
    pub fn min_latency_us(&self) -> u64 {
        let min = self.latency_min_us.load(Ordering::Relaxed);
        if min == u64::MAX {
            0
        } else {
            min
        }
    }

    /// Get maximum latency in microseconds
    pub fn max_latency_us(&self) -> u64 {
        self.latency_max_us.load(Ordering::Relaxed)
    }

    /// Get summary string
    pub fn summary(&self) -> String {
        format!(
            "Queries: {} (memo={}, bulk={}, lazy={}, oov={}) | Bulk builds: {} | Latency (µs): avg={:.1}, min={}, max={}",
            self.queries(),
            self.memo_hits(),
            self.bulk_hits(),
            self.lazy_computations(),
            self.oov_queries(),
            self.total_bulk_builds(),
            self.avg_latency_us(),
            self.min_latency_us(),
            self.max_latency_us()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let stats = ServiceStats::new();

        stats.record_query(Outcome::Lazy, Duration::from_micros(100));
        stats.record_query(Outcome::MemoHit, Duration::from_micros(200));
        stats.record_query(Outcome::BulkHit, Duration::from_micros(150));
        stats.record_bulk_build("parallel");
        stats.record_bulk_build("parallel");
        stats.record_bulk_build("brute-force");

        assert_eq!(stats.queries(), 3);
        assert_eq!(stats.lazy_computations(), 1);
        assert_eq!(stats.memo_hits(), 1);
        assert_eq!(stats.bulk_hits(), 1);
        assert_eq!(stats.oov_queries(), 0);
        assert_eq!(stats.min_latency_us(), 100);
        assert_eq!(stats.max_latency_us(), 200);
        assert!((stats.avg_latency_us() - 150.0).abs() < 0.1);

        let builds = stats.bulk_builds();
        assert_eq!(builds.get("parallel"), Some(&2));
        assert_eq!(stats.total_bulk_builds(), 3);
    }

    #[test]
    fn test_empty_summary() {
        let stats = ServiceStats::new();
        assert_eq!(stats.min_latency_us(), 0);
        assert!(stats.summary().starts_with("Queries: 0"));
    }
}
