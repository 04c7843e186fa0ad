//! Classifier for loopback and private addresses that never reach the database

use std::net::IpAddr;

/// Returns true if the string names the local host or falls in a private range.
///
/// Covers the `localhost` alias, IPv4/IPv6 loopback, and the RFC1918 IPv4
/// ranges (10/8, 172.16/12, 192.168/16). Strings that do not parse as an IP
/// address are not local; they fail later as invalid input.
pub fn is_local_addr(ip: &str) -> bool {
    if ip == "localhost" {
        return true;
    }

    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_loopback() || v4.is_private(),
        Ok(IpAddr::V6(v6)) => v6.is_loopback(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_and_alias_are_local() {
        assert!(is_local_addr("localhost"));
        assert!(is_local_addr("127.0.0.1"));
        assert!(is_local_addr("127.255.255.254"));
        assert!(is_local_addr("::1"));
    }

    #[test]
    fn rfc1918_ranges_are_local() {
        assert!(is_local_addr("10.0.0.1"));
        assert!(is_local_addr("10.255.255.255"));
        assert!(is_local_addr("172.16.0.1"));
        assert!(is_local_addr("172.31.255.255"));
        assert!(is_local_addr("192.168.1.1"));
    }

    #[test]
    fn public_addresses_are_not_local() {
        assert!(!is_local_addr("8.8.8.8"));
        assert!(!is_local_addr("1.1.1.1"));
        assert!(!is_local_addr("172.15.0.1"));
        assert!(!is_local_addr("172.32.0.1"));
        assert!(!is_local_addr("2001:4860:4860::8888"));
    }

    #[test]
    fn garbage_is_not_local() {
        assert!(!is_local_addr(""));
        assert!(!is_local_addr("not-an-ip"));
        assert!(!is_local_addr("10.0.0"));
    }
}
