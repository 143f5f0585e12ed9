//! CSV dataset loading.
//!
//! The dataset is read once into an immutable [`Dataset`] snapshot. Header
//! names are trimmed; columns other than the known [`Field`]s are ignored.
//! Empty cells and the usual tabular null spellings (`NA`, `NaN`, `null`, …)
//! load as missing values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

use crate::models::{BookRecord, Field};

/// Cell values that load as missing.
const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Identifies the exact dataset contents an index artifact was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetTag {
    pub rows: usize,
    pub sha256: String,
}

/// Read-only snapshot of the book dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    present: HashSet<Field>,
    records: Vec<BookRecord>,
    tag: DatasetTag,
}

impl Dataset {
    /// Load a CSV file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
        Self::from_csv_bytes(&bytes)
            .with_context(|| format!("Failed to parse dataset: {}", path.display()))
    }

    /// Parse CSV bytes with a header row.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader.headers()?.clone();
        let columns: Vec<String> = headers.iter().map(str::to_string).collect();

        // Position of each known field in the header; the first occurrence
        // wins when a header name repeats.
        let mut positions: Vec<(Field, usize)> = Vec::new();
        for (idx, name) in columns.iter().enumerate() {
            if let Some(field) = Field::from_column(name) {
                if !positions.iter().any(|(f, _)| *f == field) {
                    positions.push((field, idx));
                }
            }
        }
        let present = positions.iter().map(|(f, _)| *f).collect();

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let raw = result.with_context(|| format!("Malformed CSV record at row {}", row + 1))?;
            let mut record = BookRecord {
                row,
                ..Default::default()
            };
            for (field, idx) in &positions {
                record.set(*field, raw.get(*idx).and_then(clean_cell));
            }
            records.push(record);
        }

        let tag = DatasetTag {
            rows: records.len(),
            sha256: hex::encode(Sha256::digest(bytes)),
        };

        tracing::debug!(rows = records.len(), columns = columns.len(), "dataset loaded");

        Ok(Self {
            columns,
            present,
            records,
            tag,
        })
    }

    /// Build a snapshot from in-memory records. `fields` lists which known
    /// fields the schema has; row numbers are reassigned by position.
    pub fn from_records(fields: &[Field], records: Vec<BookRecord>) -> Self {
        let records: Vec<BookRecord> = records
            .into_iter()
            .enumerate()
            .map(|(row, mut r)| {
                r.row = row;
                r
            })
            .collect();
        let tag = DatasetTag {
            rows: records.len(),
            sha256: String::new(),
        };
        Self {
            columns: fields.iter().map(|f| f.column().to_string()).collect(),
            present: fields.iter().copied().collect(),
            records,
            tag,
        }
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All header names, in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, field: Field) -> bool {
        self.present.contains(&field)
    }

    pub fn tag(&self) -> &DatasetTag {
        &self.tag
    }
}

fn clean_cell(cell: &str) -> Option<String> {
    if NULL_MARKERS.contains(&cell) {
        None
    } else {
        Some(cell.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PLACEHOLDER;

    #[test]
    fn headers_are_trimmed() {
        let ds = Dataset::from_csv_bytes(b" title , author \nDune,Frank Herbert\n").unwrap();
        assert!(ds.has_column(Field::Title));
        assert!(ds.has_column(Field::Author));
        assert!(!ds.has_column(Field::Genre));
        assert_eq!(ds.records()[0].field(Field::Author), "Frank Herbert");
    }

    #[test]
    fn null_markers_load_as_missing() {
        let csv = b"title,description,pages\nDune,,NaN\nEmma,NA,474\n";
        let ds = Dataset::from_csv_bytes(csv).unwrap();
        assert_eq!(ds.records()[0].get(Field::Description), None);
        assert_eq!(ds.records()[0].get(Field::Pages), None);
        assert_eq!(ds.records()[1].get(Field::Description), None);
        assert_eq!(ds.records()[1].field(Field::Pages), "474");
    }

    #[test]
    fn null_and_absent_column_render_identically() {
        let with_col = Dataset::from_csv_bytes(b"title,description\nDune,\n").unwrap();
        let without_col = Dataset::from_csv_bytes(b"title\nDune\n").unwrap();
        assert_eq!(
            with_col.records()[0].field(Field::Description),
            without_col.records()[0].field(Field::Description)
        );
        assert_eq!(with_col.records()[0].field(Field::Description), PLACEHOLDER);
    }

    #[test]
    fn short_rows_fill_missing() {
        let ds = Dataset::from_csv_bytes(b"title,author,genre\nDune,Frank Herbert\n").unwrap();
        assert_eq!(ds.records()[0].get(Field::Genre), None);
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let ds =
            Dataset::from_csv_bytes(b"title,genre\n\"Dune\",\"Fantasy, Adventure\"\n").unwrap();
        assert_eq!(ds.records()[0].field(Field::Genre), "Fantasy, Adventure");
    }

    #[test]
    fn tag_tracks_content() {
        let a = Dataset::from_csv_bytes(b"title\nDune\n").unwrap();
        let b = Dataset::from_csv_bytes(b"title\nDune\n").unwrap();
        let c = Dataset::from_csv_bytes(b"title\nEmma\n").unwrap();
        assert_eq!(a.tag(), b.tag());
        assert_ne!(a.tag().sha256, c.tag().sha256);
        assert_eq!(a.tag().rows, 1);
    }

    #[test]
    fn rows_numbered_by_position() {
        let ds = Dataset::from_csv_bytes(b"title\nA\nB\nC\n").unwrap();
        let rows: Vec<usize> = ds.records().iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }
}
