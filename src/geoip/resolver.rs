//! Database-backed resolution of IP addresses to locations
//!
//! `Resolver` is the seam between the service and the geo database, so tests
//! and alternative backends can be swapped in behind the same trait. The
//! production implementation memory-maps a MaxMind GeoLite2/GeoIP2 City MMDB.

use anyhow::{Context, Result};
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::path::Path;
use thiserror::Error;

use crate::geoip::models::LocationInfo;

/// Lookup-time failures surfaced to the caller that requested the IP
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeoIpError {
    /// The supplied string does not parse as an IP address
    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    /// The database has no record for the address, or the query itself failed
    #[error("geo lookup failed: {0}")]
    LookupFailed(String),
}

/// Backend that maps an already-validated, non-local address to a location
pub trait Resolver: Send + Sync {
    fn lookup(&self, addr: IpAddr) -> Result<LocationInfo, GeoIpError>;
}

/// MaxMind MMDB resolver over a memory-mapped City database
pub struct MaxMindResolver {
    reader: Reader<Mmap>,
}

impl MaxMindResolver {
    /// Open a City database file. Fails if the file is missing or unreadable,
    /// in which case the surrounding application should treat geolocation as
    /// unavailable rather than crash.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = unsafe { Reader::open_mmap(path) }
            .with_context(|| format!("failed to open GeoIP database at {}", path.display()))?;
        Ok(Self { reader })
    }
}

impl Resolver for MaxMindResolver {
    fn lookup(&self, addr: IpAddr) -> Result<LocationInfo, GeoIpError> {
        let result = self
            .reader
            .lookup(addr)
            .map_err(|e| GeoIpError::LookupFailed(e.to_string()))?;

        if !result.has_data() {
            return Err(GeoIpError::LookupFailed(format!("no record for {addr}")));
        }

        let city: geoip2::City = result
            .decode()
            .map_err(|e| GeoIpError::LookupFailed(e.to_string()))?
            .ok_or_else(|| GeoIpError::LookupFailed(format!("no record for {addr}")))?;

        Ok(LocationInfo {
            country: preferred_name(&city.country.names),
            city: preferred_name(&city.city.names),
            latitude: city.location.latitude.unwrap_or_default(),
            longitude: city.location.longitude.unwrap_or_default(),
        })
    }
}

/// Pick the English name when present, otherwise the first populated locale
/// in field order. Which non-English variant wins is deterministic for a
/// given database but otherwise unspecified; callers should not rely on it.
fn preferred_name(names: &geoip2::Names) -> String {
    names
        .english
        .or(names.german)
        .or(names.spanish)
        .or(names.french)
        .or(names.japanese)
        .or(names.brazilian_portuguese)
        .or(names.russian)
        .or(names.simplified_chinese)
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_fails_on_missing_file() {
        let result = MaxMindResolver::open("/nonexistent/GeoLite2-City.mmdb");
        assert!(result.is_err());
    }

    #[test]
    fn errors_render_their_input() {
        let err = GeoIpError::InvalidIp("999.1.2.3".to_string());
        assert_eq!(err.to_string(), "invalid IP address: 999.1.2.3");

        let err = GeoIpError::LookupFailed("no record for 192.0.2.1".to_string());
        assert!(err.to_string().contains("no record for 192.0.2.1"));
    }
}
