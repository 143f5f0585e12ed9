//! Record selection over a dataset snapshot.
//!
//! Given a resolved candidate string, these functions pick the rows to
//! display. Every function is a pure read over the [`Dataset`]; results
//! borrow records from it and keep dataset order unless stated otherwise.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::models::{BookRecord, Field};

/// Rows matching a filter, truncated to a display limit.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    /// Number of rows that matched before truncation.
    pub total: usize,
    pub records: Vec<&'a BookRecord>,
}

/// Which genre filter produced a [`GenreSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenreTier {
    /// Case-insensitive equality.
    Exact,
    /// Case-insensitive substring containment, used only when no row is an
    /// exact match.
    Contains,
}

#[derive(Debug, Clone)]
pub struct GenreSelection<'a> {
    pub tier: GenreTier,
    pub selection: Selection<'a>,
}

/// First row whose title equals `title` exactly (case-sensitive).
pub fn by_title<'a>(dataset: &'a Dataset, title: &str) -> Option<&'a BookRecord> {
    dataset
        .records()
        .iter()
        .find(|r| r.get(Field::Title) == Some(title))
}

/// Rows whose author equals `author` exactly, first `limit` in dataset order.
pub fn by_author<'a>(dataset: &'a Dataset, author: &str, limit: usize) -> Selection<'a> {
    collect_limited(
        dataset
            .records()
            .iter()
            .filter(|r| r.get(Field::Author) == Some(author)),
        limit,
    )
}

/// Rows in `genre`: case-insensitive equality first, substring containment
/// only if equality finds nothing.
pub fn by_genre<'a>(dataset: &'a Dataset, genre: &str, limit: usize) -> GenreSelection<'a> {
    let exact = genre_exact(dataset, genre, limit);
    if exact.total > 0 {
        return GenreSelection {
            tier: GenreTier::Exact,
            selection: exact,
        };
    }

    tracing::debug!(genre, "no exact genre rows, trying substring match");
    GenreSelection {
        tier: GenreTier::Contains,
        selection: genre_contains(dataset, genre, limit),
    }
}

fn genre_exact<'a>(dataset: &'a Dataset, genre: &str, limit: usize) -> Selection<'a> {
    let needle = genre.to_lowercase();
    collect_limited(
        dataset
            .records()
            .iter()
            .filter(|r| r.get(Field::Genre).is_some_and(|g| g.to_lowercase() == needle)),
        limit,
    )
}

fn genre_contains<'a>(dataset: &'a Dataset, genre: &str, limit: usize) -> Selection<'a> {
    let needle = genre.to_lowercase();
    collect_limited(
        dataset
            .records()
            .iter()
            .filter(|r| r.get(Field::Genre).is_some_and(|g| g.to_lowercase().contains(&needle))),
        limit,
    )
}

/// The `limit` highest-rated rows, descending. Rows without a numeric
/// rating are left out. Equal ratings keep dataset order.
pub fn top_rated(dataset: &Dataset, limit: usize) -> Vec<(&BookRecord, f64)> {
    let mut rated: Vec<(&BookRecord, f64)> = dataset
        .records()
        .iter()
        .filter_map(|r| r.rating().map(|rating| (r, rating)))
        .collect();

    // Stable sort, so ties stay in row order.
    rated.sort_by(|a, b| b.1.total_cmp(&a.1));
    rated.truncate(limit);
    rated
}

/// One row chosen uniformly at random, `None` for an empty dataset.
pub fn random<'a, R: Rng + ?Sized>(dataset: &'a Dataset, rng: &mut R) -> Option<&'a BookRecord> {
    dataset.records().choose(rng)
}

fn collect_limited<'a>(
    matches: impl Iterator<Item = &'a BookRecord>,
    limit: usize,
) -> Selection<'a> {
    let mut total = 0;
    let mut records = Vec::new();
    for record in matches {
        if records.len() < limit {
            records.push(record);
        }
        total += 1;
    }
    Selection { total, records }
}
