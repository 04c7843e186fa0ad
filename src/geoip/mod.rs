//! IP geolocation resolution service
//!
//! Maps client IP addresses to approximate physical locations using a local
//! MaxMind MMDB database, with a TTL cache in front of the database and a
//! batching worker that coalesces concurrent lookups to bound the query rate.

pub mod batch;
pub mod cache;
pub mod local;
pub mod models;
pub mod resolver;
pub mod service;
pub mod stats;

pub use cache::LocationCache;
pub use local::is_local_addr;
pub use models::{CacheStatsSnapshot, LocationInfo, ServiceStatsSnapshot};
pub use resolver::{GeoIpError, MaxMindResolver, Resolver};
pub use service::GeoIpService;
