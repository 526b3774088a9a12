//! Portfolio construction, filtering and export.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::blacklist::RowStore;
use crate::error::Result;
use crate::models::{Config, FieldKeys, FieldValue, Fields, LinkTemplates, RecordsBySymbol, Stock};
use crate::normalizer::Normalizer;
use crate::table::write_table;

/// Why a candidate could not become a stock
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("missing market capitalization field '{0}'")]
    MissingMarketCap(String),
    #[error("market capitalization not available")]
    MarketCapUnavailable,
    #[error("missing price field '{0}'")]
    MissingPrice(String),
    #[error("price '{0}' is not a number")]
    UnparseablePrice(String),
    #[error("price is zero")]
    ZeroPrice,
}

/// Check a candidate's market cap and price and build the stock.
pub fn validate_candidate(
    symbol: &str,
    fields: Fields,
    keys: &FieldKeys,
    links: &LinkTemplates,
) -> std::result::Result<Stock, Rejection> {
    // No market cap usually means a fund, warrant or unit rather than a stock
    match fields.get(&keys.market_cap) {
        None => return Err(Rejection::MissingMarketCap(keys.market_cap.clone())),
        Some(value) if value.is_blank() || value.as_text().map(str::trim) == Some("N/A") => {
            return Err(Rejection::MarketCapUnavailable)
        }
        Some(_) => {}
    }

    let raw_price = fields
        .get(&keys.price)
        .ok_or_else(|| Rejection::MissingPrice(keys.price.clone()))?;
    let price = raw_price
        .as_f64()
        .filter(|price| price.is_finite())
        .ok_or_else(|| Rejection::UnparseablePrice(raw_price.to_string()))?;
    if price == 0.0 {
        return Err(Rejection::ZeroPrice);
    }

    Ok(Stock::new(symbol, price, fields, links))
}

/// Outcome of one `add_records` pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreationReport {
    pub passed: BTreeSet<String>,
    pub failed: BTreeSet<String>,
}

impl CreationReport {
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }
}

/// Named, ordered group of stocks
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub name: String,
    stocks: Vec<Stock>,
    keys: FieldKeys,
    links: LinkTemplates,
    export_columns: Vec<String>,
}

impl Portfolio {
    pub fn new(name: impl Into<String>, config: &Config) -> Self {
        Self {
            name: name.into(),
            stocks: Vec::new(),
            keys: config.field_keys.clone(),
            links: config.links.clone(),
            export_columns: config.export_columns.clone(),
        }
    }

    pub fn stocks(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    /// Turn candidates into stocks and record every outcome in the row store.
    pub fn add_records(&mut self, records: RecordsBySymbol, store: &mut RowStore) -> CreationReport {
        let mut report = CreationReport::default();

        for (symbol, fields) in records {
            match validate_candidate(&symbol, fields, &self.keys, &self.links) {
                Ok(stock) => {
                    self.stocks.push(stock);
                    report.passed.insert(symbol);
                }
                Err(rejection) => {
                    debug!("Rejected {}: {}", symbol, rejection);
                    report.failed.insert(symbol);
                }
            }
        }

        info!(
            "📊 {} of {} failed stock creation",
            report.failed.len(),
            report.total()
        );
        store.apply_outcomes(&report.passed, &report.failed);
        report
    }

    pub fn add_stocks(&mut self, stocks: impl IntoIterator<Item = Stock>) {
        self.stocks.extend(stocks);
    }

    pub fn clean_up(&mut self, normalizer: &Normalizer) {
        for stock in &mut self.stocks {
            normalizer.normalize(&mut stock.fields);
        }
    }

    pub fn filter_by_symbol(&mut self, blacklist: &HashSet<String>) {
        self.stocks.retain(|stock| !blacklist.contains(&stock.symbol));
    }

    /// Drop stocks whose sector field is in `blacklist`; stocks without one stay.
    pub fn filter_by_sector(&mut self, blacklist: &HashSet<String>) {
        let sector_key = &self.keys.sector;
        self.stocks.retain(|stock| {
            stock
                .field(sector_key)
                .and_then(FieldValue::as_text)
                .map_or(true, |sector| !blacklist.contains(sector))
        });
    }

    /// Stable sort by a derived key.
    pub fn sort_by<K, F>(&mut self, key: F, descending: bool)
    where
        K: PartialOrd,
        F: Fn(&Stock) -> K,
    {
        self.stocks.sort_by(|a, b| {
            let ordering = key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    /// Sort on a numeric field; stocks lacking it sort lowest.
    pub fn sort_by_field(&mut self, field: &str, descending: bool) {
        self.sort_by(|stock| stock.field(field).and_then(FieldValue::as_f64), descending);
    }

    /// Write the configured column projection of every stock.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let rows = self.stocks.iter().map(|stock| {
            self.export_columns
                .iter()
                .map(|column| stock.field(column).map(|value| value.to_string()).unwrap_or_default())
                .collect::<Vec<_>>()
        });
        write_table(path, &self.export_columns, rows)?;

        info!("💾 Wrote {} stocks from '{}' to {}", self.stocks.len(), self.name, path.display());
        Ok(())
    }
}
