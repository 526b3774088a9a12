//! Flat-file table access shared by the row store, joiner and exporter.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Rows of a delimited file together with its header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// All values of one column, in row order
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[index].as_str()))
    }

    /// A row keyed by column name
    pub fn row_map(&self, row: &[String]) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect()
    }
}

/// Read a delimited file with a header row.
///
/// Rows shorter than the header are padded with empty fields and longer rows
/// are cut to the header width, so trailer lines do not abort the read.
pub fn read_table(path: impl AsRef<Path>, delimiter: u8) -> Result<Table> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(columns.len(), String::new());
        rows.push(row);
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(Table { columns, rows })
}

/// Write a comma-delimited file with a header row.
pub fn write_table<R>(path: impl AsRef<Path>, columns: &[String], rows: R) -> Result<()>
where
    R: IntoIterator,
    R::Item: AsRef<[String]>,
{
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;

    let mut written = 0;
    for row in rows {
        writer.write_record(row.as_ref())?;
        written += 1;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", written, path.display());
    Ok(())
}
