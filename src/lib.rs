pub mod config;
pub mod geoip;
