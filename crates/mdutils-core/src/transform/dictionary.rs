use crate::error::{Error, InvalidDataError, Result};
use crate::parsing::{Record, Value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct DictRow(i64, i64);

/// An old-id to new-id mapping. Several old ids may share a new id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenumberDict {
    map: BTreeMap<i64, i64>,
}

impl RenumberDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old: i64, new: i64) -> Option<i64> {
        self.map.insert(old, new)
    }

    pub fn get(&self, old: i64) -> Option<i64> {
        self.map.get(&old).copied()
    }

    /// The mapped id, or `old` itself when it is not a key.
    pub fn apply(&self, old: i64) -> i64 {
        self.get(old).unwrap_or(old)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.map.iter().map(|(&k, &v)| (k, v))
    }

    /// Loads a two-column `old,new` CSV file.
    ///
    /// A first row that is not numeric is taken as a header. Extra columns are
    /// ignored. With `check_unique`, an old id assigned twice to different new
    /// ids is logged as a warning; the later assignment wins either way.
    pub fn from_csv_path(path: &Path, check_unique: bool) -> Result<Self> {
        let source = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;

        let mut dict = Self::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| csv_error(path, e))?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map_or(idx + 1, |p| p.line() as usize);
            let pair: csv::StringRecord = record.iter().take(2).collect();
            let row = match pair.deserialize::<DictRow>(None) {
                Ok(row) => row,
                Err(_) if idx == 0 => {
                    debug!("Skipping header row of dictionary file {}", source);
                    continue;
                }
                Err(_) => {
                    let content = record.iter().collect::<Vec<_>>().join(",");
                    return Err(InvalidDataError::new(
                        "expected two integer columns (old id, new id)",
                    )
                    .in_file(source)
                    .at_line(line, content)
                    .into());
                }
            };

            let DictRow(old, new) = row;
            if let Some(previous) = dict.insert(old, new) {
                if check_unique && previous != new {
                    warn!(
                        "Non-unique key {} in dictionary file {}: reassigned from {} to {}",
                        old, source, previous, new
                    );
                }
            }
        }
        debug!("Read {} renumbering pairs from {}", dict.len(), source);
        Ok(dict)
    }
}

impl FromIterator<(i64, i64)> for RenumberDict {
    fn from_iter<T: IntoIterator<Item = (i64, i64)>>(iter: T) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

fn csv_error(path: &Path, err: csv::Error) -> Error {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(source) => Error::io(path, source),
            other => InvalidDataError::new(format!("{:?}", other))
                .in_file(path.display().to_string())
                .into(),
        }
    } else {
        InvalidDataError::new(err.to_string())
            .in_file(path.display().to_string())
            .into()
    }
}

/// Returns copies of `records` with the integer field at `id_index` renumbered.
///
/// Fields that are not integers, and ids that are not keys of `dict`, are
/// left unchanged.
pub fn remap(records: &[Record], id_index: usize, dict: &RenumberDict) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            if let Some(old) = record.int(id_index) {
                record.set(id_index, Value::Int(dict.apply(old)));
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_pairs_skipping_header_and_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dict.csv");
        fs::write(&path, "old,new\n# comment\n1, 20\n\n9,2\n").unwrap();
        let dict = RenumberDict::from_csv_path(&path, true).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(1), Some(20));
        assert_eq!(dict.apply(9), 2);
        assert_eq!(dict.apply(5), 5);
    }

    #[test]
    fn later_assignment_wins_for_repeated_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dict.csv");
        fs::write(&path, "3,4\n3,5\n").unwrap();
        assert_eq!(RenumberDict::from_csv_path(&path, true).unwrap().get(3), Some(5));
        assert_eq!(RenumberDict::from_csv_path(&path, false).unwrap().get(3), Some(5));
    }

    #[test]
    fn non_numeric_row_after_first_is_invalid_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dict.csv");
        fs::write(&path, "1,2\n3,x\n").unwrap();
        match RenumberDict::from_csv_path(&path, false).unwrap_err() {
            Error::InvalidData(e) => {
                assert_eq!(e.line, Some(2));
                assert!(e.file.unwrap().ends_with("dict.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_dictionary_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let result = RenumberDict::from_csv_path(&dir.path().join("none.csv"), false);
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn remap_replaces_only_mapped_ids() {
        let dict: RenumberDict = [(1, 20), (9, 2), (4, 2)].into_iter().collect();
        let records: Vec<Record> = [1, 4, 5, 9]
            .iter()
            .map(|&id| Record::new(vec![Value::Int(id), Value::Float(0.5)]))
            .collect();
        let remapped = remap(&records, 0, &dict);
        for (before, after) in records.iter().zip(&remapped) {
            let old = before.int(0).unwrap();
            assert_eq!(after.int(0), Some(dict.get(old).unwrap_or(old)));
            assert_eq!(after.get(1), before.get(1));
        }
        assert_eq!(records[0].int(0), Some(1));
    }

    #[test]
    fn remap_ignores_non_integer_fields() {
        let dict: RenumberDict = [(1, 2)].into_iter().collect();
        let records = vec![Record::new(vec![Value::Str("1".into())])];
        assert_eq!(remap(&records, 0, &dict), records);
        assert_eq!(remap(&records, 5, &dict), records);
    }
}
