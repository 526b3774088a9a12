//! Join the downloaded symbol lists and report new and retired symbols

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stock_sifter::joint_table::JointTable;
use stock_sifter::models::{parse_delimiter, Config};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Delimiter of the source files (single character, or pipe/comma/tab)
    #[arg(short, long)]
    delimiter: Option<String>,

    /// Skip the comparison against the previous snapshot
    #[arg(long)]
    no_diff: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stock_sifter=info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let config = Config::from_env()?;
    let delimiter = match &args.delimiter {
        Some(raw) => parse_delimiter(raw)?,
        None => config.source_delimiter,
    };

    let mut joint = JointTable::join(config.join_inputs.as_slice(), delimiter)?;
    joint.dedupe();
    joint.write(&config.symbol_path)?;
    info!("💾 Wrote joined symbols to {}", config.symbol_path.display());

    if args.no_diff {
        info!("{}", joint);
        return Ok(());
    }
    if !config.old_symbol_path.exists() {
        warn!(
            "⚠️  No previous symbol list at {}, skipping comparison",
            config.old_symbol_path.display()
        );
        info!("{}", joint);
        return Ok(());
    }

    let key = config.symbol_column.clone();
    let (only_in_old, only_in_new) = joint.diff(&config.old_symbol_path, &[key.clone()])?;
    let new_stocks = only_in_new.get(&key).cloned().unwrap_or_default();
    let retired_stocks = only_in_old.get(&key).cloned().unwrap_or_default();

    if new_stocks.is_empty() && retired_stocks.is_empty() {
        info!("No new stocks, no retired stocks.");
    } else {
        info!("🆕 New stocks: {:?}", new_stocks);
        info!("👋 Retired stocks: {:?}", retired_stocks);
    }

    info!("{}", joint);
    Ok(())
}
