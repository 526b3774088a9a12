//! Common test utilities and helpers

/// Test data utilities
pub mod fixtures {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use stock_sifter::models::{Config, Fields};

    /// Config rooted in `dir` with no pacing and a local quote endpoint
    pub fn test_config(dir: &Path, quote_base: &str) -> Config {
        let mut config = Config::with_data_dir(dir);
        config.quote_url_template = format!("{}/quotes?s={{symbols}}", quote_base);
        config.batch_size = 10;
        config.quote_delay = Duration::ZERO;
        config.scrape_delay = Duration::ZERO;
        config.export_columns = ["Symbol", "MarketCapitalization", "LastTradePriceOnly", "GoogleUrl"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        config
    }

    /// Quote fields with the given market cap and price
    pub fn candidate(market_cap: &str, price: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("MarketCapitalization".to_string(), market_cap.into());
        fields.insert("LastTradePriceOnly".to_string(), price.into());
        fields
    }

    pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    pub fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }
}

/// Logging utilities for tests
pub mod logging {
    use std::sync::Once;
    use tracing::{debug, info};

    static INIT: Once = Once::new();

    /// Initialize test logging
    pub fn init_test_logging() {
        INIT.call_once(|| {
            // Another test may already have installed a subscriber
            let _ = tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter("stock_sifter=debug,main=debug")
                    .with_test_writer()
                    .finish(),
            );
        });
    }

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("🧪 Test Step: {}", step);
    }

    /// Log test data
    pub fn log_test_data<T: std::fmt::Debug>(label: &str, data: &T) {
        debug!("📊 {}: {:?}", label, data);
    }
}
