//! Joining, deduping and diffing of same-schema symbol tables.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, SiftError};
use crate::table::{read_table, write_table};

/// Separator used when building a row's content key
const CONTENT_KEY_SEPARATOR: &str = ",";

/// Values present in only one of two compared tables, per key column
pub type ColumnDiff = BTreeMap<String, BTreeSet<String>>;

/// Rows concatenated from several tables sharing one header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl JointTable {
    /// Concatenate `sources` in order; all must share the same ordered header.
    pub fn join<P: AsRef<Path>>(sources: &[P], delimiter: u8) -> Result<Self> {
        let mut joint: Option<JointTable> = None;

        for source in sources {
            let source = source.as_ref();
            let table = read_table(source, delimiter)?;

            match joint.as_mut() {
                None => {
                    joint = Some(JointTable {
                        columns: table.columns,
                        rows: table.rows,
                    })
                }
                Some(joint) => {
                    if joint.columns != table.columns {
                        return Err(SiftError::schema(
                            source,
                            format!(
                                "columns [{}] do not match [{}]",
                                table.columns.join(", "),
                                joint.columns.join(", ")
                            ),
                        ));
                    }
                    joint.rows.extend(table.rows);
                }
            }
            debug!("Joined {}", source.display());
        }

        Ok(joint.unwrap_or_default())
    }

    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Collapse rows with the same non-empty content.
    ///
    /// The key is every non-empty value in column order, so two sparse rows
    /// whose filled-in values coincide are treated as the same row. The
    /// surviving row is the last one seen, kept at the position of the first.
    pub fn dedupe(&mut self) {
        let before = self.rows.len();
        let mut slot_by_key: HashMap<String, usize> = HashMap::new();
        let mut deduped: Vec<Vec<String>> = Vec::with_capacity(before);

        for row in self.rows.drain(..) {
            let key = content_key(&row);
            match slot_by_key.get(&key) {
                Some(&slot) => deduped[slot] = row,
                None => {
                    slot_by_key.insert(key, deduped.len());
                    deduped.push(row);
                }
            }
        }

        self.rows = deduped;
        info!("🧹 Deduped {} rows down to {}", before, self.rows.len());
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        write_table(path, &self.columns, &self.rows)
    }

    /// Compare each key column against a comma-delimited table.
    ///
    /// Returns `(only_in_other, only_in_self)`; columns are compared
    /// independently, not as a composite key.
    pub fn diff(&self, other_path: impl AsRef<Path>, key_columns: &[String]) -> Result<(ColumnDiff, ColumnDiff)> {
        let other_path = other_path.as_ref();
        let other = read_table(other_path, b',')?;

        let mut only_in_other = ColumnDiff::new();
        let mut only_in_self = ColumnDiff::new();

        for column in key_columns {
            let own_index = self.columns.iter().position(|c| c == column).ok_or_else(|| {
                SiftError::schema(other_path, format!("key column '{}' missing from joint table", column))
            })?;
            let other_values: BTreeSet<String> = other
                .column_values(column)
                .ok_or_else(|| {
                    SiftError::schema(other_path, format!("key column '{}' missing from comparison table", column))
                })?
                .map(str::to_string)
                .collect();
            let own_values: BTreeSet<String> = self.rows.iter().map(|row| row[own_index].clone()).collect();

            only_in_other.insert(column.clone(), other_values.difference(&own_values).cloned().collect());
            only_in_self.insert(column.clone(), own_values.difference(&other_values).cloned().collect());
        }

        Ok((only_in_other, only_in_self))
    }
}

fn content_key(row: &[String]) -> String {
    row.iter()
        .filter(|value| !value.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(CONTENT_KEY_SEPARATOR)
}

impl fmt::Display for JointTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JointTable has {} rows, with following columns:\n{}",
            self.rows.len(),
            self.columns.join(", ")
        )
    }
}
