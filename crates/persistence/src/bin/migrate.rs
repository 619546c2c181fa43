#![deny(warnings)]

use persistence::default_sqlite_url;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    let pool = persistence::init_db(&url).await?;
    // Sanity: counters readable on a fresh schema
    let stats = persistence::dashboard_stats(&pool).await?;
    println!(
        "DB migrated at {} | scans: {} | simulations: {}",
        url, stats.scans, stats.simulations
    );
    Ok(())
}
