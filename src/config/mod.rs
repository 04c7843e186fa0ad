use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the geolocation service, fixed at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// How long a resolved location stays valid in the cache, in seconds
    #[serde(default = "GeoIpConfig::default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Interval between background sweeps of expired cache entries, in seconds
    #[serde(default = "GeoIpConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Number of queued lookups that triggers an immediate batch flush
    #[serde(default = "GeoIpConfig::default_batch_size")]
    pub batch_size: usize,

    /// How long the worker waits for a batch to fill before flushing, in milliseconds
    #[serde(default = "GeoIpConfig::default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,

    /// Capacity of the bounded intake queue; overflow falls back to direct resolution
    #[serde(default = "GeoIpConfig::default_queue_capacity")]
    pub queue_capacity: usize,
}

impl GeoIpConfig {
    const fn default_cache_ttl_secs() -> u64 {
        3600
    }

    const fn default_sweep_interval_secs() -> u64 {
        1800
    }

    const fn default_batch_size() -> usize {
        10
    }

    const fn default_batch_timeout_ms() -> u64 {
        50
    }

    const fn default_queue_capacity() -> usize {
        1000
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let cache_ttl_secs = env_or("GEOIP_CACHE_TTL_SECS", Self::default_cache_ttl_secs())?;
        let sweep_interval_secs = env_or(
            "GEOIP_SWEEP_INTERVAL_SECS",
            Self::default_sweep_interval_secs(),
        )?;
        let batch_size = env_or("GEOIP_BATCH_SIZE", Self::default_batch_size())?;
        let batch_timeout_ms = env_or("GEOIP_BATCH_TIMEOUT_MS", Self::default_batch_timeout_ms())?;
        let queue_capacity = env_or("GEOIP_QUEUE_CAPACITY", Self::default_queue_capacity())?;

        Ok(GeoIpConfig {
            cache_ttl_secs,
            sweep_interval_secs,
            batch_size,
            batch_timeout_ms,
            queue_capacity,
        })
    }
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        GeoIpConfig {
            cache_ttl_secs: Self::default_cache_ttl_secs(),
            sweep_interval_secs: Self::default_sweep_interval_secs(),
            batch_size: Self::default_batch_size(),
            batch_timeout_ms: Self::default_batch_timeout_ms(),
            queue_capacity: Self::default_queue_capacity(),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GeoIpConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(1800));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.batch_timeout(), Duration::from_millis(50));
        assert_eq!(config.queue_capacity, 1000);
    }
}
