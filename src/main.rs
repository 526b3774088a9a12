use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stock_sifter::api::HttpFetcher;
use stock_sifter::ingestion::run_sift;
use stock_sifter::models::Config;

/// Screen the joined symbol list against live quotes and write a dated snapshot
#[derive(Parser, Debug)]
#[command(name = "stock-sifter", version, about, long_about = None)]
struct Args {
    /// Snapshot date in YYYYMMDD format (defaults to today)
    #[arg(short, long)]
    date: Option<String>,

    /// Numeric field to sort the snapshot by, largest first
    #[arg(short, long)]
    sort_field: Option<String>,

    /// Sectors to leave out of the snapshot
    #[arg(long, value_delimiter = ',')]
    exclude_sector: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stock_sifter=info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("🚀 Starting stock sifter");

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    if args.sort_field.is_some() {
        config.sort_field = args.sort_field;
    }
    if !args.exclude_sector.is_empty() {
        config.sector_blacklist = args.exclude_sector;
    }

    let date = match &args.date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y%m%d")
            .map_err(|e| anyhow!("Invalid date '{}': {}. Expected YYYYMMDD", raw, e))?,
        None => chrono::Local::now().date_naive(),
    };

    let fetcher = HttpFetcher::new()?;
    let summary = run_sift(&config, &fetcher, date).await?;

    info!("✅ Sift results:");
    info!("   - Blacklisted symbols: {}", summary.blacklisted);
    info!("   - Candidates: {}", summary.candidates);
    info!("   - Passed: {}", summary.passed);
    info!("   - Failed: {}", summary.failed);
    info!("   - Exported: {}", summary.exported);
    info!("💾 Snapshot written to {}", summary.output_path.display());

    Ok(())
}
