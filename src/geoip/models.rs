//! Data models for geolocation results and monitoring snapshots

use serde::{Deserialize, Serialize};

/// Approximate physical location resolved from an IP address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    /// Country name (e.g., "United States")
    pub country: String,

    /// City name
    pub city: String,

    /// WGS84 latitude in degrees
    pub latitude: f64,

    /// WGS84 longitude in degrees
    pub longitude: f64,
}

impl LocationInfo {
    /// Fixed record returned for loopback and RFC1918 addresses
    pub fn local() -> Self {
        LocationInfo {
            country: "Local".to_string(),
            city: "Local".to_string(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

/// Read-only view of the service counters for external monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Hit rate as a percentage of total requests; 0 when nothing was requested
    pub cache_hit_rate: f64,
    /// Number of flushed batches
    pub batch_processed: u64,
    /// Number of lookups resolved on the direct path (queue full or closed)
    pub direct_processed: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    /// Wall-clock time of the last error, formatted as "YYYY-MM-DD HH:MM:SS"
    pub last_error_at: Option<String>,
}

/// Read-only view of the location cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    /// Number of entries currently stored, including not-yet-swept expired ones
    pub entries: usize,

    /// Configured time-to-live in seconds
    pub ttl_secs: u64,
}
