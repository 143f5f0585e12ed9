//! Dataset statistics and index health overview.
//!
//! Provides a quick summary of what is loaded: row and column counts,
//! candidate list sizes, where the lookup index came from, and how many rows
//! are missing each field. Used by `books stats` to give confidence that the
//! dataset and any precomputed index line up.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::index::IndexSource;
use crate::lookup::Library;
use crate::models::Field;
use crate::present::OutputFormat;

/// Per-field coverage of the dataset.
#[derive(Debug, Clone, Serialize)]
pub struct FieldStats {
    pub field: Field,
    pub present: bool,
    pub missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryStats {
    pub rows: usize,
    pub columns: Vec<String>,
    pub sha256: String,
    pub size_bytes: u64,
    pub index: String,
    pub index_matches_dataset: Option<bool>,
    pub titles: usize,
    pub authors: usize,
    pub genres: usize,
    pub rated: usize,
    pub fields: Vec<FieldStats>,
}

/// Compute stats for a loaded library.
pub fn collect(library: &Library, size_bytes: u64) -> LibraryStats {
    let dataset = library.dataset();
    let index = library.index();

    let fields = Field::ALL
        .into_iter()
        .map(|field| FieldStats {
            field,
            present: dataset.has_column(field),
            missing: dataset
                .records()
                .iter()
                .filter(|r| r.get(field).is_none())
                .count(),
        })
        .collect();

    let index_matches_dataset = match library.index_source() {
        IndexSource::Built => Some(true),
        IndexSource::Cache(_) => index.dataset.as_ref().map(|tag| tag == dataset.tag()),
    };

    LibraryStats {
        rows: dataset.len(),
        columns: dataset.columns().to_vec(),
        sha256: dataset.tag().sha256.clone(),
        size_bytes,
        index: library.index_source().to_string(),
        index_matches_dataset,
        titles: index.titles.len(),
        authors: index.authors.len(),
        genres: index.genres.len(),
        rated: dataset
            .records()
            .iter()
            .filter(|r| r.rating().is_some())
            .count(),
        fields,
    }
}

/// Run the stats command and print a summary of the loaded library.
pub fn run_stats(config: &Config, library: &Library, format: OutputFormat) -> Result<()> {
    let size = std::fs::metadata(&config.dataset.path)
        .map(|m| m.len())
        .unwrap_or(0);
    let stats = collect(library, size);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Book Explorer — Dataset Stats");
    println!("=============================");
    println!();
    println!("  Dataset:     {}", config.dataset.path.display());
    println!("  Size:        {}", format_bytes(stats.size_bytes));
    println!("  SHA-256:     {}", stats.sha256);
    println!("  Rows:        {}", stats.rows);
    println!("  Columns:     {}", stats.columns.join(", "));
    println!();
    println!("  Index:       {}", stats.index);
    let agreement = match stats.index_matches_dataset {
        Some(true) => "matches dataset",
        Some(false) => "built from a different dataset",
        None => "untagged",
    };
    println!("  Index tag:   {}", agreement);
    println!("  Titles:      {}", stats.titles);
    println!("  Authors:     {}", stats.authors);
    println!("  Genres:      {}", stats.genres);
    println!(
        "  Rated:       {} / {} ({}%)",
        stats.rated,
        stats.rows,
        if stats.rows > 0 {
            (stats.rated * 100) / stats.rows
        } else {
            0
        }
    );

    println!();
    println!("  By field:");
    println!("  {:<16} {:>8} {:>8}", "FIELD", "COLUMN", "MISSING");
    println!("  {}", "-".repeat(34));
    for f in &stats.fields {
        println!(
            "  {:<16} {:>8} {:>8}",
            f.field.column(),
            if f.present { "yes" } else { "no" },
            f.missing
        );
    }
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
