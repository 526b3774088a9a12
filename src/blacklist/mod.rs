//! Symbol blacklist accounting.
//!
//! The row store keeps one success/failure counter pair per symbol. A symbol
//! is blacklisted at read time when it has failed often enough and its
//! success-to-failure ratio is at or below the configured threshold.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, SiftError};
use crate::models::{BlacklistPolicy, SymbolRecord};

pub const SYMBOL_COLUMN: &str = "symbol";
pub const SUCCESS_COLUMN: &str = "successes";
pub const FAILURE_COLUMN: &str = "failures";
pub const ROW_STORE_HEADER: [&str; 3] = [SYMBOL_COLUMN, SUCCESS_COLUMN, FAILURE_COLUMN];

/// In-memory copy of the persisted symbol counters, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowStore {
    records: Vec<SymbolRecord>,
}

impl RowStore {
    pub fn new(records: Vec<SymbolRecord>) -> Self {
        Self { records }
    }

    /// Load every record; any malformed content or repeated symbol fails the whole load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SiftError::storage(path, "file does not exist"));
        }

        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| SiftError::storage(path, e.to_string()))?;
        let header = reader
            .headers()
            .map_err(|e| SiftError::storage(path, e.to_string()))?;
        if header.iter().ne(ROW_STORE_HEADER.iter().copied()) {
            return Err(SiftError::storage(
                path,
                format!(
                    "expected header '{}', found '{}'",
                    ROW_STORE_HEADER.join(","),
                    header.iter().collect::<Vec<_>>().join(",")
                ),
            ));
        }

        let mut records = Vec::new();
        let mut seen = HashSet::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(|e| SiftError::storage(path, e.to_string()))?;
            let symbol = row.get(0).unwrap_or_default().to_string();
            if !seen.insert(symbol.clone()) {
                return Err(SiftError::storage(
                    path,
                    format!("row {}: symbol '{}' appears more than once", line + 1, symbol),
                ));
            }
            let successes = parse_count(path, line, SUCCESS_COLUMN, row.get(1))?;
            let failures = parse_count(path, line, FAILURE_COLUMN, row.get(2))?;
            records.push(SymbolRecord { symbol, successes, failures });
        }

        debug!("Loaded {} symbol records from {}", records.len(), path.display());
        Ok(Self { records })
    }

    /// Load the store, starting an empty one when the file does not exist yet.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        info!("📋 No row store at {}, starting empty", path.display());
        let store = Self::default();
        store.persist(path)?;
        Ok(store)
    }

    pub fn records(&self) -> &[SymbolRecord] {
        &self.records
    }

    pub fn record(&self, symbol: &str) -> Option<&SymbolRecord> {
        self.records.iter().find(|record| record.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Symbols that should be excluded from this run.
    pub fn compute_blacklist(&self, minimum_failures: u64, ratio_threshold: f64) -> HashSet<String> {
        self.records
            .iter()
            .filter(|record| is_blacklisted(record, minimum_failures, ratio_threshold))
            .map(|record| record.symbol.clone())
            .collect()
    }

    pub fn blacklist(&self, policy: &BlacklistPolicy) -> HashSet<String> {
        self.compute_blacklist(policy.minimum_failures, policy.ratio_threshold)
    }

    /// Fold one run's outcomes into the counters.
    pub fn apply_outcomes(&mut self, success_symbols: &BTreeSet<String>, failure_symbols: &BTreeSet<String>) {
        self.records = merge_outcomes(&self.records, success_symbols, failure_symbols);
    }

    /// Rewrite the whole table through a temporary file renamed over `path`.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(file.as_file_mut());
            writer.write_record(ROW_STORE_HEADER)?;
            for record in &self.records {
                writer.write_record([
                    record.symbol.as_str(),
                    &record.successes.to_string(),
                    &record.failures.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        file.as_file_mut().flush()?;
        file.as_file().sync_all()?;
        file.persist(path)?;

        debug!("Persisted {} symbol records to {}", self.records.len(), path.display());
        Ok(())
    }
}

fn parse_count(path: &Path, line: usize, column: &str, raw: Option<&str>) -> Result<u64> {
    let raw = raw.unwrap_or_default();
    raw.trim().parse::<u64>().map_err(|_| {
        SiftError::storage(
            path,
            format!("row {}: {} '{}' is not a non-negative integer", line + 1, column, raw),
        )
    })
}

/// Blacklist rule for a single record.
///
/// A ratio exactly at the threshold counts, so one success in five failures
/// is blacklisted at a threshold of 0.2.
pub fn is_blacklisted(record: &SymbolRecord, minimum_failures: u64, ratio_threshold: f64) -> bool {
    if record.failures == 0 {
        return false;
    }
    record.failures >= minimum_failures
        && (record.successes as f64) / (record.failures as f64) <= ratio_threshold
}

/// Build the next table from the previous one and a run's outcomes.
///
/// Tracked symbols keep their position and are incremented once per list they
/// appear in. `old` is expected to hold each symbol once, as `RowStore::load`
/// guarantees. Untracked symbols are appended, successes first then failures; a
/// new symbol in both lists is only inserted from the success list.
pub fn merge_outcomes(
    old: &[SymbolRecord],
    success_symbols: &BTreeSet<String>,
    failure_symbols: &BTreeSet<String>,
) -> Vec<SymbolRecord> {
    let tracked: HashMap<&str, usize> = old
        .iter()
        .enumerate()
        .map(|(index, record)| (record.symbol.as_str(), index))
        .collect();

    let mut merged: Vec<SymbolRecord> = old
        .iter()
        .map(|record| SymbolRecord {
            symbol: record.symbol.clone(),
            successes: record.successes + u64::from(success_symbols.contains(&record.symbol)),
            failures: record.failures + u64::from(failure_symbols.contains(&record.symbol)),
        })
        .collect();

    let mut inserted: HashSet<&str> = HashSet::new();
    let new_successes = success_symbols.iter().map(|symbol| (symbol, 1, 0));
    let new_failures = failure_symbols.iter().map(|symbol| (symbol, 0, 1));
    for (symbol, successes, failures) in new_successes.chain(new_failures) {
        if tracked.contains_key(symbol.as_str()) || !inserted.insert(symbol.as_str()) {
            continue;
        }
        merged.push(SymbolRecord::new(symbol.clone(), successes, failures));
    }

    merged
}

/// Offline correction: push long-failing symbols further towards the blacklist.
pub fn boost_failures(path: impl AsRef<Path>, threshold: u64, boost_by: u64) -> Result<usize> {
    let path = path.as_ref();
    let store = RowStore::load(path)?;

    let mut boosted = 0;
    let records = store
        .records
        .into_iter()
        .map(|mut record| {
            if record.failures > threshold {
                record.failures = record.failures.saturating_add(boost_by);
                boosted += 1;
            }
            record
        })
        .collect();

    RowStore::new(records).persist(path)?;
    info!("📈 Boosted failures of {} symbols by {}", boosted, boost_by);
    Ok(boosted)
}
