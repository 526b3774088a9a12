use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Persisted success/failure counters for one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol: String,
    pub successes: u64,
    pub failures: u64,
}

impl SymbolRecord {
    pub fn new(symbol: impl Into<String>, successes: u64, failures: u64) -> Self {
        Self {
            symbol: symbol.into(),
            successes,
            failures,
        }
    }
}

/// A single stock attribute, either as scraped or after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Number(_) => None,
        }
    }

    /// Numeric view of the field; text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Text(text) => text.trim().parse().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(value) => write!(f, "{}", value),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// Named attributes of one stock, keyed by source column name
pub type Fields = BTreeMap<String, FieldValue>;

/// Stock candidate data keyed by symbol
pub type RecordsBySymbol = BTreeMap<String, Fields>;

/// Core stock information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stock {
    pub symbol: String,
    pub price: f64,
    pub fields: Fields,
}

impl Stock {
    /// Build a stock and synthesize its profile and filings URL fields.
    pub fn new(symbol: impl Into<String>, price: f64, mut fields: Fields, links: &LinkTemplates) -> Self {
        let symbol = symbol.into();
        fields.insert(
            links.profile_field.clone(),
            FieldValue::Text(links.profile_url(&symbol)),
        );
        fields.insert(
            links.filings_field.clone(),
            FieldValue::Text(links.filings_url(&symbol)),
        );
        Self { symbol, price, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Where the per-symbol link columns come from
#[derive(Debug, Clone)]
pub struct LinkTemplates {
    pub profile_field: String,
    pub profile_template: String,
    pub filings_field: String,
    pub filings_template: String,
}

impl LinkTemplates {
    pub fn profile_url(&self, symbol: &str) -> String {
        self.profile_template.replace("{symbol}", symbol)
    }

    pub fn filings_url(&self, symbol: &str) -> String {
        self.filings_template.replace("{symbol}", symbol)
    }
}

impl Default for LinkTemplates {
    fn default() -> Self {
        Self {
            profile_field: "GoogleUrl".to_string(),
            profile_template: "https://www.google.com/finance?q={symbol}".to_string(),
            filings_field: "SecUrl".to_string(),
            filings_template:
                "https://www.sec.gov/cgi-bin/browse-edgar?action=getcompany&CIK={symbol}".to_string(),
        }
    }
}

/// Names of the quote fields the portfolio depends on
#[derive(Debug, Clone)]
pub struct FieldKeys {
    pub quote_symbol: String,
    pub market_cap: String,
    pub price: String,
    pub sector: String,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            quote_symbol: "symbol".to_string(),
            market_cap: "MarketCapitalization".to_string(),
            price: "LastTradePriceOnly".to_string(),
            sector: "Sector".to_string(),
        }
    }
}

/// A remote symbol list and the local file it is saved to
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSource {
    pub url: String,
    pub path: PathBuf,
}

/// Blacklist thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlacklistPolicy {
    /// Failures required before a symbol can be blacklisted
    pub minimum_failures: u64,
    /// Symbols whose success/failure ratio is below this are blacklisted
    pub ratio_threshold: f64,
}

impl Default for BlacklistPolicy {
    fn default() -> Self {
        Self {
            minimum_failures: 3,
            ratio_threshold: 0.2,
        }
    }
}

pub const DEFAULT_QUOTE_URL_TEMPLATE: &str = "https://query.yahooapis.com/v1/public/yql?q=select%20*%20from%20yahoo.finance.quotes%20where%20symbol%20in%20({symbols})&format=json&env=store%3A%2F%2Fdatatables.org%2Falltableswithkeys";

pub const DEFAULT_EXPORT_COLUMNS: &[&str] = &[
    "Symbol",
    "Security Name",
    "LastTradePriceOnly",
    "MarketCapitalization",
    "PERatio",
    "PEGRatio",
    "PriceBook",
    "EBITDA",
    "DividendYield",
    "YearLow",
    "YearHigh",
    "AverageDailyVolume",
    "GoogleUrl",
    "SecUrl",
];

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub row_store_path: PathBuf,
    pub symbol_sources: Vec<SymbolSource>,
    pub join_inputs: Vec<PathBuf>,
    pub symbol_path: PathBuf,
    pub old_symbol_path: PathBuf,
    pub symbol_column: String,
    pub source_delimiter: u8,
    pub quote_url_template: String,
    pub batch_size: usize,
    pub quote_delay: Duration,
    pub scrape_delay: Duration,
    pub blacklist: BlacklistPolicy,
    pub boost_failure_threshold: u64,
    pub boost_failures_by: u64,
    pub chars_to_remove: Vec<char>,
    pub sector_blacklist: Vec<String>,
    pub sort_field: Option<String>,
    pub export_columns: Vec<String>,
    pub field_keys: FieldKeys,
    pub links: LinkTemplates,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_data_dir("data")
    }
}

impl Config {
    /// Defaults with every file placed under `data_dir`
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let nasdaq_path = data_dir.join("nasdaq_symbols.txt");

        Config {
            row_store_path: data_dir.join("symbol_data.csv"),
            symbol_sources: vec![SymbolSource {
                url: "https://www.nasdaqtrader.com/dynamic/SymDir/nasdaqlisted.txt".to_string(),
                path: nasdaq_path.clone(),
            }],
            join_inputs: vec![nasdaq_path],
            symbol_path: data_dir.join("stock_symbols.csv"),
            old_symbol_path: data_dir.join("stock_symbols_old.csv"),
            symbol_column: "Symbol".to_string(),
            source_delimiter: b'|',
            quote_url_template: DEFAULT_QUOTE_URL_TEMPLATE.to_string(),
            batch_size: 100,
            quote_delay: Duration::from_secs(5),
            scrape_delay: Duration::from_secs(3),
            blacklist: BlacklistPolicy::default(),
            boost_failure_threshold: 0,
            boost_failures_by: 1,
            chars_to_remove: vec!['$', ',', '%', '+'],
            sector_blacklist: Vec::new(),
            sort_field: None,
            export_columns: DEFAULT_EXPORT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            field_keys: FieldKeys::default(),
            links: LinkTemplates::default(),
            data_dir,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let data_dir = std::env::var("SIFTER_DATA_DIR").unwrap_or_else(|_| "data".to_string());
        let mut config = Config::with_data_dir(&data_dir);

        if let Ok(path) = std::env::var("SIFTER_ROW_STORE_PATH") {
            config.row_store_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("SIFTER_SYMBOL_PATH") {
            config.symbol_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("SIFTER_OLD_SYMBOL_PATH") {
            config.old_symbol_path = PathBuf::from(path);
        }

        let urls = env_list("SIFTER_SYMBOL_URLS");
        let paths = env_list("SIFTER_SYMBOL_PATHS");
        if !urls.is_empty() || !paths.is_empty() {
            if urls.len() != paths.len() {
                return Err(anyhow::anyhow!(
                    "SIFTER_SYMBOL_URLS has {} entries but SIFTER_SYMBOL_PATHS has {}",
                    urls.len(),
                    paths.len()
                ));
            }
            config.symbol_sources = urls
                .into_iter()
                .zip(paths)
                .map(|(url, path)| SymbolSource { url, path: PathBuf::from(path) })
                .collect();
        }

        let join_inputs = env_list("SIFTER_JOIN_INPUTS");
        if !join_inputs.is_empty() {
            config.join_inputs = join_inputs.into_iter().map(PathBuf::from).collect();
        }

        if let Ok(column) = std::env::var("SIFTER_SYMBOL_COLUMN") {
            config.symbol_column = column;
        }
        if let Ok(delimiter) = std::env::var("SIFTER_SOURCE_DELIMITER") {
            config.source_delimiter = parse_delimiter(&delimiter)?;
        }
        if let Ok(template) = std::env::var("SIFTER_QUOTE_URL_TEMPLATE") {
            config.quote_url_template = template;
        }

        config.batch_size = env_parse("SIFTER_BATCH_SIZE", config.batch_size)?;
        config.quote_delay =
            Duration::from_millis(env_parse("SIFTER_QUOTE_DELAY_MS", config.quote_delay.as_millis() as u64)?);
        config.scrape_delay =
            Duration::from_millis(env_parse("SIFTER_SCRAPE_DELAY_MS", config.scrape_delay.as_millis() as u64)?);
        config.blacklist.minimum_failures =
            env_parse("SIFTER_MINIMUM_FAILURES", config.blacklist.minimum_failures)?;
        config.blacklist.ratio_threshold =
            env_parse("SIFTER_SUCCESS_TO_FAILURE_RATIO", config.blacklist.ratio_threshold)?;
        config.boost_failure_threshold =
            env_parse("SIFTER_BOOST_FAILURE_THRESHOLD", config.boost_failure_threshold)?;
        config.boost_failures_by = env_parse("SIFTER_BOOST_FAILURES_BY", config.boost_failures_by)?;

        if let Ok(chars) = std::env::var("SIFTER_CHARS_TO_REMOVE") {
            config.chars_to_remove = chars.chars().collect();
        }

        let sectors = env_list("SIFTER_SECTOR_BLACKLIST");
        if !sectors.is_empty() {
            config.sector_blacklist = sectors;
        }

        config.sort_field = std::env::var("SIFTER_SORT_FIELD").ok().filter(|f| !f.is_empty());

        let columns = env_list("SIFTER_EXPORT_COLUMNS");
        if !columns.is_empty() {
            config.export_columns = columns;
        }

        if config.batch_size == 0 {
            return Err(anyhow::anyhow!("SIFTER_BATCH_SIZE must be at least 1"));
        }

        Ok(config)
    }

    /// Dated output path for a portfolio snapshot
    pub fn snapshot_path(&self, date: chrono::NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("stock_data_{}.csv", date.format("%Y-%m-%d")))
    }
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|value| {
            value
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

/// Parse a one-byte delimiter; accepts the words `pipe`, `comma` and `tab`.
pub fn parse_delimiter(raw: &str) -> anyhow::Result<u8> {
    match raw {
        "pipe" => Ok(b'|'),
        "comma" => Ok(b','),
        "tab" | "\\t" => Ok(b'\t'),
        other if other.len() == 1 => Ok(other.as_bytes()[0]),
        other => Err(anyhow::anyhow!("Delimiter must be a single byte, got '{}'", other)),
    }
}
