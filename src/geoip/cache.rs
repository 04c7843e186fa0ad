//! TTL cache for resolved locations
//!
//! A single reader/writer lock over a plain map is sufficient for the modest
//! IP cardinality this service sees. Expiry is checked on every read, so a
//! stale entry can at worst cause one extra resolution; a periodic sweep
//! (driven by the service) bounds growth from long tails of one-off IPs.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::geoip::models::LocationInfo;

struct CacheEntry {
    info: LocationInfo,
    stored_at: Instant,
}

pub struct LocationCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl LocationCache {
    pub fn new(ttl: Duration) -> Self {
        LocationCache {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up a location by normalized IP key. Expired entries are treated
    /// as absent and removed. Hit/miss accounting is the caller's job so it
    /// happens exactly once per external lookup.
    pub fn get(&self, key: &str) -> Option<LocationInfo> {
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(key) {
                Some(entry) if entry.stored_at.elapsed() <= self.ttl => {
                    return Some(entry.info.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: upgrade to a write lock and remove, re-checking the age in
        // case a concurrent put refreshed the entry in between.
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get(key) {
            if entry.stored_at.elapsed() <= self.ttl {
                return Some(entry.info.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Insert or replace the entry for a key with a fresh timestamp.
    pub fn put(&self, key: String, info: LocationInfo) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            CacheEntry {
                info,
                stored_at: Instant::now(),
            },
        );
    }

    /// Remove every expired entry, returning how many were evicted.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(city: &str) -> LocationInfo {
        LocationInfo {
            country: "Testland".to_string(),
            city: city.to_string(),
            latitude: 1.0,
            longitude: 2.0,
        }
    }

    #[test]
    fn put_then_get_returns_stored_value() {
        let cache = LocationCache::new(Duration::from_secs(60));
        cache.put("8.8.8.8".to_string(), location("Mountain View"));

        let found = cache.get("8.8.8.8").unwrap();
        assert_eq!(found.city, "Mountain View");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn get_absent_key_returns_none() {
        let cache = LocationCache::new(Duration::from_secs(60));
        assert!(cache.get("1.1.1.1").is_none());
    }

    #[test]
    fn expired_entry_is_absent_and_removed_on_read() {
        let cache = LocationCache::new(Duration::ZERO);
        cache.put("8.8.8.8".to_string(), location("Mountain View"));

        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("8.8.8.8").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn put_replaces_entry_and_refreshes_timestamp() {
        let cache = LocationCache::new(Duration::from_secs(60));
        cache.put("8.8.8.8".to_string(), location("Old"));
        cache.put("8.8.8.8".to_string(), location("New"));

        assert_eq!(cache.get("8.8.8.8").unwrap().city, "New");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sweep_evicts_only_expired_entries() {
        let cache = LocationCache::new(Duration::from_millis(20));
        cache.put("1.1.1.1".to_string(), location("A"));

        std::thread::sleep(Duration::from_millis(40));
        cache.put("2.2.2.2".to_string(), location("B"));

        let evicted = cache.sweep();
        assert_eq!(evicted, 1);
        assert!(cache.get("1.1.1.1").is_none());
        assert!(cache.get("2.2.2.2").is_some());
    }
}
