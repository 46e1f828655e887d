//! Joining two CSV tables on a shared numeric column.

use crate::error::{Error, InvalidDataError, Result};
use crate::io::write_atomically;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// A join key compared by numeric value, so `100`, `100.0` and `1e2` meet.
#[derive(Debug, Clone, Copy)]
struct Key(f64);

impl Key {
    fn parse(text: &str) -> Option<Self> {
        let value: f64 = text.parse().ok()?;
        if value.is_nan() {
            None
        } else if value == 0.0 {
            Some(Self(0.0))
        } else {
            Some(Self(value))
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    /// Names the table in error messages.
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;
        let headers = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(String::from)
            .collect();
        let rows = reader
            .records()
            .map(|r| {
                r.map(|record| record.iter().map(String::from).collect())
                    .map_err(|e| csv_error(path, e))
            })
            .collect::<Result<Vec<Vec<String>>>>()?;
        debug!("Read {} rows from {}", rows.len(), source);
        Ok(Self {
            source,
            headers,
            rows,
        })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require_column(&self, name: &str) -> std::result::Result<usize, InvalidDataError> {
        self.column(name).ok_or_else(|| {
            InvalidDataError::new(format!("no column named '{}'", name))
                .in_file(self.source.clone())
                .with_content(self.headers.join(","))
        })
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map_or("", String::as_str)
    }

    /// Maps each numeric key value to its row.
    fn index_by(&self, key: usize) -> std::result::Result<BTreeMap<Key, usize>, InvalidDataError> {
        let mut index = BTreeMap::new();
        for (row_idx, row) in self.rows.iter().enumerate() {
            let text = self.cell(row_idx, key);
            let value = Key::parse(text).ok_or_else(|| {
                InvalidDataError::new(format!("key '{}' is not numeric", text))
                    .in_file(self.source.clone())
                    .with_field(self.headers[key].clone())
                    .at_line(row_idx + 2, row.join(","))
            })?;
            if index.insert(value, row_idx).is_some() {
                warn!(
                    "Repeated key '{}' in {}; using its last row",
                    text, self.source
                );
            }
        }
        Ok(index)
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        write_atomically(path, |out| {
            let mut writer = csv::Writer::from_writer(out);
            writer
                .write_record(&self.headers)
                .map_err(|e| csv_error(path, e))?;
            for row in &self.rows {
                writer.write_record(row).map_err(|e| csv_error(path, e))?;
            }
            writer.flush().map_err(|e| Error::io(path, e))?;
            Ok(())
        })
    }
}

fn csv_error(path: &Path, err: csv::Error) -> Error {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => Error::io(path, source),
        other => InvalidDataError::new(format!("malformed CSV: {:?}", other))
            .in_file(path.display().to_string())
            .into(),
    }
}

/// Joins `left` and `right` on the column `key`.
///
/// Only key values present in both tables are kept, in ascending numeric
/// order. The key column comes first, followed by the remaining columns of
/// `left` and then those columns of `right` whose names are not taken yet.
pub fn align_on_column(left: &CsvTable, right: &CsvTable, key: &str) -> Result<CsvTable> {
    let left_key = left.require_column(key)?;
    let right_key = right.require_column(key)?;
    let left_index = left.index_by(left_key)?;
    let right_index = right.index_by(right_key)?;

    let left_cols: Vec<usize> = (0..left.headers.len()).filter(|&i| i != left_key).collect();
    let mut headers = vec![key.to_string()];
    headers.extend(left_cols.iter().map(|&i| left.headers[i].clone()));
    let right_cols: Vec<usize> = (0..right.headers.len())
        .filter(|&i| i != right_key && !headers.contains(&right.headers[i]))
        .collect();
    headers.extend(right_cols.iter().map(|&i| right.headers[i].clone()));

    let rows = left_index
        .iter()
        .filter_map(|(value, &l)| right_index.get(value).map(|&r| (l, r)))
        .map(|(l, r)| {
            let mut row = vec![left.cell(l, left_key).to_string()];
            row.extend(left_cols.iter().map(|&i| left.cell(l, i).to_string()));
            row.extend(right_cols.iter().map(|&i| right.cell(r, i).to_string()));
            row
        })
        .collect::<Vec<_>>();

    info!(
        "Aligned {} and {} on '{}': {} shared rows",
        left.source,
        right.source,
        key,
        rows.len()
    );
    Ok(CsvTable {
        source: left.source.clone(),
        headers,
        rows,
    })
}
