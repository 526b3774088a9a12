//! Download the configured symbol lists to their local paths

use anyhow::{anyhow, Result};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stock_sifter::api::{ApiRateLimiter, HttpFetcher};
use stock_sifter::ingestion::fetch_symbol_sources;
use stock_sifter::models::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stock_sifter=info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let config = Config::from_env()?;
    let fetcher = HttpFetcher::new()?;

    info!("🌐 Fetching {} symbol sources", config.symbol_sources.len());
    let report = fetch_symbol_sources(
        &fetcher,
        &config.symbol_sources,
        ApiRateLimiter::new(config.scrape_delay),
    )
    .await;

    if !report.is_complete() {
        for (url, e) in &report.failed {
            error!("   - {}: {}", url, e);
        }
        return Err(anyhow!(
            "{} of {} symbol sources failed",
            report.failed.len(),
            config.symbol_sources.len()
        ));
    }

    info!("✅ Stock symbol data retrieved.");
    Ok(())
}
