//! Candidate lists for fuzzy lookup.
//!
//! A [`LookupIndex`] holds the unique, non-null titles, authors, and genres
//! of a dataset in first-seen order. It is either loaded from a precomputed
//! JSON artifact or built by scanning the dataset once.
//!
//! # Artifact format
//!
//! ```json
//! {
//!   "titles": ["Dune", "Emma"],
//!   "authors": ["Frank Herbert", "Jane Austen"],
//!   "genres": ["Science Fiction", "Romance"],
//!   "dataset": { "rows": 2, "sha256": "…" }
//! }
//! ```
//!
//! Missing lists load as empty. The optional `dataset` tag records which
//! dataset the artifact was built from. Artifacts are trusted as-is unless
//! `index.verify` is set, in which case a tag that disagrees with the loaded
//! dataset causes a rebuild. An artifact that cannot be read or parsed is
//! treated as absent.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{Config, IndexConfig};
use crate::dataset::{Dataset, DatasetTag};
use crate::models::{CandidateKind, Field};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupIndex {
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetTag>,
}

/// Where the index in use came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSource {
    Cache(PathBuf),
    Built,
}

impl fmt::Display for IndexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexSource::Cache(path) => write!(f, "cache ({})", path.display()),
            IndexSource::Built => f.write_str("built"),
        }
    }
}

impl LookupIndex {
    /// Scan the dataset once and collect unique values per searchable
    /// column. Columns absent from the schema yield empty lists.
    pub fn build(dataset: &Dataset) -> Self {
        Self {
            titles: unique_values(dataset, Field::Title),
            authors: unique_values(dataset, Field::Author),
            genres: unique_values(dataset, Field::Genre),
            dataset: Some(dataset.tag().clone()),
        }
    }

    pub fn candidates(&self, kind: CandidateKind) -> &[String] {
        match kind {
            CandidateKind::Title => &self.titles,
            CandidateKind::Author => &self.authors,
            CandidateKind::Genre => &self.genres,
        }
    }

    /// Read an artifact from disk.
    /// True when every candidate list is empty.
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.authors.is_empty() && self.genres.is_empty()
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read index: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse index: {}", path.display()))
    }

    /// Write this index as a pretty-printed JSON artifact.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write index: {}", path.display()))?;
        Ok(())
    }

    /// Use the configured artifact when it is usable, otherwise build from
    /// the dataset. Never fails: every cache problem degrades to a rebuild.
    pub fn load_or_build(dataset: &Dataset, config: &IndexConfig) -> (Self, IndexSource) {
        let Some(path) = &config.path else {
            return (Self::build(dataset), IndexSource::Built);
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no precomputed index, building");
            return (Self::build(dataset), IndexSource::Built);
        }

        let cached = match Self::read(path) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{:#}", e),
                    "failed to load precomputed index, rebuilding"
                );
                return (Self::build(dataset), IndexSource::Built);
            }
        };

        if cached.is_empty() {
            tracing::warn!(path = %path.display(), "precomputed index is empty, rebuilding");
            return (Self::build(dataset), IndexSource::Built);
        }

        if let Some(tag) = &cached.dataset {
            if tag != dataset.tag() {
                if config.verify {
                    tracing::warn!(
                        path = %path.display(),
                        index_rows = tag.rows,
                        dataset_rows = dataset.tag().rows,
                        "precomputed index is stale, rebuilding"
                    );
                    return (Self::build(dataset), IndexSource::Built);
                }
                tracing::warn!(
                    path = %path.display(),
                    index_rows = tag.rows,
                    dataset_rows = dataset.tag().rows,
                    "precomputed index was built from a different dataset"
                );
            }
        }

        (cached, IndexSource::Cache(path.clone()))
    }
}

fn unique_values(dataset: &Dataset, field: Field) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for record in dataset.records() {
        if let Some(value) = record.get(field) {
            if seen.insert(value) {
                values.push(value.to_string());
            }
        }
    }
    values
}

/// CLI entry point for `books index build`.
///
/// Refuses to overwrite the artifact configured as `index.path`.
pub fn run_build(config: &Config, dataset: &Dataset, output: &Path) -> Result<()> {
    if let Some(configured) = &config.index.path {
        if same_file(configured, output) {
            bail!(
                "refusing to overwrite the configured index ({}); choose another --output",
                configured.display()
            );
        }
    }

    let index = LookupIndex::build(dataset);
    index.write(output)?;

    println!("index written: {}", output.display());
    println!("  titles:  {}", index.titles.len());
    println!("  authors: {}", index.authors.len());
    println!("  genres:  {}", index.genres.len());
    println!("  rows:    {}", dataset.len());
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Dataset {
        Dataset::from_csv_bytes(
            b"title,author,genre\n\
              Dune,Frank Herbert,Science Fiction\n\
              Dune Messiah,Frank Herbert,Science Fiction\n\
              Emma,Jane Austen,\n\
              Dune,Frank Herbert,Classic\n",
        )
        .unwrap()
    }

    #[test]
    fn build_dedups_in_first_seen_order() {
        let idx = LookupIndex::build(&sample());
        assert_eq!(idx.titles, vec!["Dune", "Dune Messiah", "Emma"]);
        assert_eq!(idx.authors, vec!["Frank Herbert", "Jane Austen"]);
        assert_eq!(idx.genres, vec!["Science Fiction", "Classic"]);
        assert_eq!(idx.dataset.as_ref().unwrap().rows, 4);
    }

    #[test]
    fn absent_column_gives_empty_list() {
        let ds = Dataset::from_csv_bytes(b"title\nDune\n").unwrap();
        let idx = LookupIndex::build(&ds);
        assert!(idx.genres.is_empty());
        assert!(idx.authors.is_empty());
        assert_eq!(idx.candidates(CandidateKind::Title), ["Dune".to_string()]);
    }

    #[test]
    fn no_path_builds() {
        let (idx, source) = LookupIndex::load_or_build(&sample(), &IndexConfig::default());
        assert_eq!(source, IndexSource::Built);
        assert_eq!(idx.titles.len(), 3);
    }

    #[test]
    fn cache_used_as_is() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(&path, r#"{"titles": ["Only Cached"]}"#).unwrap();

        let config = IndexConfig {
            path: Some(path.clone()),
            verify: true,
        };
        let (idx, source) = LookupIndex::load_or_build(&sample(), &config);
        assert_eq!(source, IndexSource::Cache(path));
        assert_eq!(idx.titles, vec!["Only Cached"]);
        assert!(idx.authors.is_empty());
    }

    #[test]
    fn corrupt_cache_falls_back_to_build() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(&path, "not json at all").unwrap();

        let config = IndexConfig {
            path: Some(path),
            verify: false,
        };
        let (idx, source) = LookupIndex::load_or_build(&sample(), &config);
        assert_eq!(source, IndexSource::Built);
        assert_eq!(idx.titles.len(), 3);
    }

    #[test]
    fn empty_cache_is_rebuilt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(&path, "{}").unwrap();

        let config = IndexConfig {
            path: Some(path),
            verify: false,
        };
        let (idx, source) = LookupIndex::load_or_build(&sample(), &config);
        assert_eq!(source, IndexSource::Built);
        assert_eq!(idx.titles, vec!["Dune", "Dune Messiah", "Emma"]);
        assert!(!idx.is_empty());
    }

    #[test]
    fn stale_tag_trusted_without_verify() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        let stale = LookupIndex {
            titles: vec!["Old".into()],
            dataset: Some(DatasetTag {
                rows: 99,
                sha256: "deadbeef".into(),
            }),
            ..Default::default()
        };
        stale.write(&path).unwrap();

        let lenient = IndexConfig {
            path: Some(path.clone()),
            verify: false,
        };
        let (idx, source) = LookupIndex::load_or_build(&sample(), &lenient);
        assert!(matches!(source, IndexSource::Cache(_)));
        assert_eq!(idx.titles, vec!["Old"]);

        let strict = IndexConfig {
            path: Some(path),
            verify: true,
        };
        let (idx, source) = LookupIndex::load_or_build(&sample(), &strict);
        assert_eq!(source, IndexSource::Built);
        assert_eq!(idx.titles.len(), 3);
    }

    #[test]
    fn write_then_read_keeps_tag() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/index.json");
        let ds = sample();
        LookupIndex::build(&ds).write(&path).unwrap();
        let read = LookupIndex::read(&path).unwrap();
        assert_eq!(read.dataset.as_ref(), Some(ds.tag()));
    }

    #[test]
    fn build_refuses_configured_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        let mut config = Config::minimal();
        config.index.path = Some(path.clone());

        let err = run_build(&config, &sample(), &path).unwrap_err();
        assert!(err.to_string().contains("refusing"));
        assert!(!path.exists());
    }
}
