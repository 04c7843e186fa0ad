//! Mutex-guarded service counters
//!
//! One lock serializes every increment and the snapshot read. Counters are
//! individually consistent but a snapshot may observe a request that has not
//! yet been attributed as hit or miss; good enough for monitoring.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::geoip::models::ServiceStatsSnapshot;

#[derive(Default)]
struct StatsInner {
    total_requests: u64,
    cache_hits: u64,
    cache_misses: u64,
    batch_processed: u64,
    direct_processed: u64,
    errors: u64,
    last_error: Option<String>,
    last_error_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct ServiceStats {
    inner: Mutex<StatsInner>,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatsInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count one lookup that reached the queue or the direct path.
    pub fn record_request(&self) {
        self.lock().total_requests += 1;
    }

    pub fn record_hit(&self) {
        self.lock().cache_hits += 1;
    }

    pub fn record_miss(&self) {
        self.lock().cache_misses += 1;
    }

    /// Count one flushed batch (not one request).
    pub fn record_batch(&self) {
        self.lock().batch_processed += 1;
    }

    pub fn record_direct(&self) {
        self.lock().direct_processed += 1;
    }

    pub fn record_error(&self, message: &str) {
        let mut inner = self.lock();
        inner.errors += 1;
        inner.last_error = Some(message.to_string());
        inner.last_error_at = Some(Utc::now());
    }

    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        let inner = self.lock();

        let cache_hit_rate = if inner.total_requests > 0 {
            inner.cache_hits as f64 / inner.total_requests as f64 * 100.0
        } else {
            0.0
        };

        ServiceStatsSnapshot {
            total_requests: inner.total_requests,
            cache_hits: inner.cache_hits,
            cache_misses: inner.cache_misses,
            cache_hit_rate,
            batch_processed: inner.batch_processed,
            direct_processed: inner.direct_processed,
            errors: inner.errors,
            last_error: inner.last_error.clone(),
            last_error_at: inner
                .last_error_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stats_report_zero_hit_rate() {
        let stats = ServiceStats::new();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.cache_hit_rate, 0.0);
        assert!(snapshot.last_error.is_none());
        assert!(snapshot.last_error_at.is_none());
    }

    #[test]
    fn hit_rate_is_a_percentage_of_total_requests() {
        let stats = ServiceStats::new();
        stats.record_request();
        stats.record_request();
        stats.record_request();
        stats.record_request();
        stats.record_hit();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.cache_hits, 1);
        assert!((snapshot.cache_hit_rate - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_error_keeps_count_message_and_time() {
        let stats = ServiceStats::new();
        stats.record_error("no record for 192.0.2.1");
        stats.record_error("no record for 192.0.2.2");

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.errors, 2);
        assert_eq!(
            snapshot.last_error.as_deref(),
            Some("no record for 192.0.2.2")
        );
        assert!(snapshot.last_error_at.is_some());
    }
}
