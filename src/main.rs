use anyhow::{Context, Result};
use clap::Parser;
use ipgeo::config::GeoIpConfig;
use ipgeo::geoip::GeoIpService;

#[derive(Parser)]
#[command(name = "ipgeo")]
#[command(about = "Resolve IP addresses against a local MaxMind City database", long_about = None)]
struct Cli {
    /// Path to the GeoLite2/GeoIP2 City .mmdb file (defaults to GEOIP_DB_PATH)
    #[arg(long)]
    db: Option<String>,

    /// Print service and cache statistics as JSON after resolving
    #[arg(long)]
    stats: bool,

    /// IP addresses to resolve
    #[arg(required = true)]
    ips: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = GeoIpConfig::from_env()?;

    let db_path = match cli.db {
        Some(path) => path,
        None => std::env::var("GEOIP_DB_PATH")
            .context("pass --db or set GEOIP_DB_PATH to the .mmdb file")?,
    };

    let service = GeoIpService::open(&db_path, config)?;

    for ip in &cli.ips {
        match service.resolve(ip).await {
            Ok(info) => println!(
                "IP: {ip:<40} | country: {:<20} | city: {:<20} | ({:.4}, {:.4})",
                info.country, info.city, info.latitude, info.longitude
            ),
            Err(err) => println!("IP: {ip:<40} | error: {err}"),
        }
    }

    if cli.stats {
        println!(
            "{}",
            serde_json::to_string_pretty(&service.service_stats())?
        );
        println!("{}", serde_json::to_string_pretty(&service.cache_stats())?);
    }

    service.shutdown();
    Ok(())
}
