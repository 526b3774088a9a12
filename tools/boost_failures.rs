use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stock_sifter::blacklist::boost_failures;
use stock_sifter::models::Config;

/// Boost failure counts of long-failing symbols in the row store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Only symbols with more failures than this are boosted
    #[arg(short, long)]
    threshold: Option<u64>,

    /// Number of failures to add
    #[arg(short, long)]
    boost_by: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stock_sifter=info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let config = Config::from_env()?;
    let threshold = args.threshold.unwrap_or(config.boost_failure_threshold);
    let boost_by = args.boost_by.unwrap_or(config.boost_failures_by);

    info!(
        "🔧 Boosting failures above {} by {} in {}",
        threshold,
        boost_by,
        config.row_store_path.display()
    );
    let boosted = boost_failures(&config.row_store_path, threshold, boost_by)?;
    info!("✅ {} symbols boosted", boosted);

    Ok(())
}
