//! End-to-end ingestion: symbol sources in, dated portfolio snapshot out.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::api::{ApiRateLimiter, QuoteClient, UrlFetcher};
use crate::blacklist::RowStore;
use crate::error::{Result, SiftError};
use crate::models::{Config, FieldValue, Fields, RecordsBySymbol, SymbolSource};
use crate::normalizer::Normalizer;
use crate::portfolio::Portfolio;
use crate::table::read_table;

/// Footer line the NASDAQ symbol directory appends to its listing
const FILE_CREATION_MARKER: &str = "File Creation Time";

/// Outcome of downloading the symbol sources
#[derive(Debug, Default)]
pub struct FetchReport {
    pub fetched: Vec<PathBuf>,
    pub failed: Vec<(String, SiftError)>,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Download each source to its local path, pausing between requests.
///
/// A failed source is recorded in the report and the remaining sources are
/// still fetched.
pub async fn fetch_symbol_sources<F: UrlFetcher + ?Sized>(
    fetcher: &F,
    sources: &[SymbolSource],
    rate_limiter: ApiRateLimiter,
) -> FetchReport {
    let mut report = FetchReport::default();

    for (index, source) in sources.iter().enumerate() {
        if index > 0 {
            rate_limiter.wait().await;
        }

        match fetch_to_file(fetcher, &source.url, &source.path).await {
            Ok(bytes) => {
                info!("✅ Saved {} bytes from {} to {}", bytes, source.url, source.path.display());
                report.fetched.push(source.path.clone());
            }
            Err(e) => {
                error!("❌ Failed to fetch {}: {}", source.url, e);
                report.failed.push((source.url.clone(), e));
            }
        }
    }

    report
}

async fn fetch_to_file<F: UrlFetcher + ?Sized>(fetcher: &F, url: &str, path: &Path) -> Result<usize> {
    let body = fetcher.fetch_url(url).await?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &body)?;
    Ok(body.len())
}

/// Read symbol rows keyed by `symbol_column`, leaving out blacklisted symbols.
pub fn load_symbol_data(
    path: impl AsRef<Path>,
    delimiter: u8,
    symbol_column: &str,
    blacklist: &HashSet<String>,
) -> Result<RecordsBySymbol> {
    let path = path.as_ref();
    let table = read_table(path, delimiter)?;
    let symbol_index = table
        .column_index(symbol_column)
        .ok_or_else(|| SiftError::schema(path, format!("no '{}' column", symbol_column)))?;

    let mut records = RecordsBySymbol::new();
    let mut skipped = 0;
    for row in &table.rows {
        let symbol = row[symbol_index].trim();
        if symbol.is_empty() || symbol.starts_with(FILE_CREATION_MARKER) {
            continue;
        }
        if blacklist.contains(symbol) {
            skipped += 1;
            continue;
        }

        let fields: Fields = table
            .row_map(row)
            .into_iter()
            .map(|(column, value)| (column, FieldValue::Text(value)))
            .collect();
        records.insert(symbol.to_string(), fields);
    }

    info!(
        "📋 Loaded {} symbols from {} ({} blacklisted)",
        records.len(),
        path.display(),
        skipped
    );
    Ok(records)
}

/// Overlay quote fields onto the symbol-file records.
///
/// Quotes for symbols absent from `base` are dropped. Returns how many were.
pub fn merge_quotes(base: &mut RecordsBySymbol, quotes: RecordsBySymbol) -> usize {
    let mut ignored = 0;
    for (symbol, quote_fields) in quotes {
        match base.get_mut(&symbol) {
            Some(fields) => fields.extend(quote_fields),
            None => {
                debug!("Quote for untracked symbol {} ignored", symbol);
                ignored += 1;
            }
        }
    }
    ignored
}

/// Summary of one sift run
#[derive(Debug, Clone, PartialEq)]
pub struct SiftSummary {
    pub blacklisted: usize,
    pub candidates: usize,
    pub passed: usize,
    pub failed: usize,
    pub exported: usize,
    pub output_path: PathBuf,
}

/// Run the whole pipeline and write the snapshot for `date`.
pub async fn run_sift<F: UrlFetcher + ?Sized>(config: &Config, fetcher: &F, date: NaiveDate) -> Result<SiftSummary> {
    let mut store = RowStore::load_or_create(&config.row_store_path)?;
    let blacklist = store.blacklist(&config.blacklist);
    info!("🚫 {} symbols blacklisted", blacklist.len());

    let mut records = load_symbol_data(&config.symbol_path, b',', &config.symbol_column, &blacklist)?;

    let symbols: Vec<String> = records.keys().cloned().collect();
    let quotes = QuoteClient::new(fetcher, config).batch_quote_fetch(&symbols).await?;
    let ignored = merge_quotes(&mut records, quotes);
    if ignored > 0 {
        warn!("⚠️  Ignored quotes for {} symbols missing from {}", ignored, config.symbol_path.display());
    }

    let candidates = records.len();
    let mut portfolio = Portfolio::new("Whole Portfolio", config);
    let report = portfolio.add_records(records, &mut store);
    store.persist(&config.row_store_path)?;

    if !config.sector_blacklist.is_empty() {
        let sectors: HashSet<String> = config.sector_blacklist.iter().cloned().collect();
        portfolio.filter_by_sector(&sectors);
    }
    portfolio.clean_up(&Normalizer::new(&config.chars_to_remove));
    if let Some(field) = &config.sort_field {
        portfolio.sort_by_field(field, true);
    }

    let output_path = config.snapshot_path(date);
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    portfolio.export(&output_path)?;

    Ok(SiftSummary {
        blacklisted: blacklist.len(),
        candidates,
        passed: report.passed.len(),
        failed: report.failed.len(),
        exported: portfolio.len(),
        output_path,
    })
}
