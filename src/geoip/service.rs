//! Public surface of the geolocation service
//!
//! `GeoIpService` owns the background batch worker and cache sweeper for its
//! whole lifetime; both are started at construction and stopped by an
//! explicit `shutdown()`. Callers only see `resolve` plus two read-only
//! monitoring snapshots.

use anyhow::Result;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::config::GeoIpConfig;
use crate::geoip::batch::{BatchWorker, LookupRequest};
use crate::geoip::cache::LocationCache;
use crate::geoip::local::is_local_addr;
use crate::geoip::models::{CacheStatsSnapshot, LocationInfo, ServiceStatsSnapshot};
use crate::geoip::resolver::{GeoIpError, MaxMindResolver, Resolver};
use crate::geoip::stats::ServiceStats;

/// State shared between the service handle, the batch worker and the sweeper.
pub(crate) struct ServiceCore {
    pub(crate) resolver: Arc<dyn Resolver>,
    pub(crate) cache: LocationCache,
    pub(crate) stats: ServiceStats,
}

impl ServiceCore {
    /// Resolve one validated, non-local address and write the result through
    /// to the cache. A failure is recorded once and returned; there are no
    /// internal retries.
    pub(crate) fn resolve_one(&self, addr: IpAddr, key: &str) -> Result<LocationInfo, GeoIpError> {
        match self.resolver.lookup(addr) {
            Ok(info) => {
                self.cache.put(key.to_string(), info.clone());
                Ok(info)
            }
            Err(err) => {
                self.stats.record_error(&err.to_string());
                Err(err)
            }
        }
    }
}

pub struct GeoIpService {
    core: Arc<ServiceCore>,
    intake_tx: mpsc::Sender<LookupRequest>,
    shutdown_tx: watch::Sender<bool>,
}

impl GeoIpService {
    /// Open a MaxMind City database and start the service. Must be called
    /// from within a tokio runtime.
    pub fn open<P: AsRef<Path>>(db_path: P, config: GeoIpConfig) -> Result<Self> {
        let resolver = Arc::new(MaxMindResolver::open(db_path)?);
        Ok(Self::with_resolver(resolver, config))
    }

    /// Start the service on top of an arbitrary resolver backend.
    pub fn with_resolver(resolver: Arc<dyn Resolver>, config: GeoIpConfig) -> Self {
        let core = Arc::new(ServiceCore {
            resolver,
            cache: LocationCache::new(config.cache_ttl()),
            stats: ServiceStats::new(),
        });

        // mpsc requires a nonzero capacity
        let (intake_tx, intake_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = BatchWorker {
            receiver: intake_rx,
            shutdown_rx: shutdown_rx.clone(),
            core: Arc::clone(&core),
            batch_size: config.batch_size.max(1),
            batch_timeout: config.batch_timeout(),
        };
        tokio::spawn(worker.run());

        let sweep_core = Arc::clone(&core);
        let mut sweep_shutdown = shutdown_rx;
        let sweep_interval = config.sweep_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            // Skip the first tick which fires immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let evicted = sweep_core.cache.sweep();
                        if evicted > 0 {
                            debug!(evicted, "swept expired geoip cache entries");
                        }
                    }
                    changed = sweep_shutdown.changed() => {
                        if changed.is_err() || *sweep_shutdown.borrow() {
                            debug!("geoip cache sweeper stopped");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            core,
            intake_tx,
            shutdown_tx,
        }
    }

    /// Resolve a client IP string to a location.
    ///
    /// Loopback/private addresses short-circuit to a fixed "Local" record
    /// without touching the cache or the database. Everything else goes
    /// through the cache and then the batching worker; when the intake queue
    /// is full the lookup degrades to an inline resolution instead of
    /// blocking or being dropped.
    pub async fn resolve(&self, ip: &str) -> Result<LocationInfo, GeoIpError> {
        if is_local_addr(ip) {
            return Ok(LocationInfo::local());
        }

        let addr: IpAddr = ip
            .parse()
            .map_err(|_| GeoIpError::InvalidIp(ip.to_string()))?;
        let key = addr.to_string();

        if let Some(info) = self.core.cache.get(&key) {
            self.core.stats.record_hit();
            return Ok(info);
        }
        self.core.stats.record_miss();
        self.core.stats.record_request();

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = LookupRequest {
            addr,
            key: key.clone(),
            reply: reply_tx,
        };

        match self.intake_tx.try_send(request) {
            Ok(()) => match reply_rx.await {
                Ok(result) => result,
                Err(_) => Err(GeoIpError::LookupFailed(format!(
                    "lookup for {addr} was dropped before completion"
                ))),
            },
            // Queue full, or closed after shutdown: resolve inline.
            Err(_) => {
                self.core.stats.record_direct();
                self.core.resolve_one(addr, &key)
            }
        }
    }

    /// Counters for external monitoring; read-only and side-effect-free.
    pub fn service_stats(&self) -> ServiceStatsSnapshot {
        self.core.stats.snapshot()
    }

    /// Cache occupancy and configured TTL; read-only and side-effect-free.
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            entries: self.core.cache.len(),
            ttl_secs: self.core.cache.ttl().as_secs(),
        }
    }

    /// Stop the batch worker and the sweeper. Queued lookups are still
    /// answered; later calls to `resolve` take the direct path.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverResolver;

    impl Resolver for NeverResolver {
        fn lookup(&self, addr: IpAddr) -> Result<LocationInfo, GeoIpError> {
            panic!("resolver must not be consulted, got {addr}");
        }
    }

    fn service() -> GeoIpService {
        GeoIpService::with_resolver(Arc::new(NeverResolver), GeoIpConfig::default())
    }

    #[tokio::test]
    async fn local_addresses_bypass_cache_and_resolver() {
        let service = service();

        for ip in [
            "127.0.0.1",
            "::1",
            "localhost",
            "10.1.2.3",
            "172.16.5.5",
            "192.168.0.1",
        ] {
            let info = service.resolve(ip).await.unwrap();
            assert_eq!(info, LocationInfo::local());
        }

        assert_eq!(service.cache_stats().entries, 0);
        let stats = service.service_stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 0);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_enqueue() {
        let service = service();

        let err = service.resolve("999.999.1.1").await.unwrap_err();
        assert!(matches!(err, GeoIpError::InvalidIp(_)));

        // Not counted as a request or as a database failure.
        let stats = service.service_stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.errors, 0);
    }
}
