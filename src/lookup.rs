//! Lookup actions over an immutable library snapshot.
//!
//! A [`Library`] bundles the loaded [`Dataset`] with its [`LookupIndex`]
//! and selection settings. It is built once at startup and every action
//! borrows it; nothing here mutates after construction, so a `Library` can
//! be shared freely across threads.
//!
//! Each action resolves a free-text query against one candidate list with
//! the fuzzy resolver, then selects the matching rows. Misses are reported
//! as [`LookupError`] values. None of them are fatal; the CLI prints them as
//! warnings.
//!
//! | Action | Candidates | Selection |
//! |--------|-----------|-----------|
//! | [`Library::title`] | titles | first row with that exact title |
//! | [`Library::author`] | authors | up to `list_limit` rows, dataset order |
//! | [`Library::genre`] | genres | exact (case-insensitive), else substring |
//! | [`Library::top_rated`] | — | `top_limit` highest numeric ratings |
//! | [`Library::random`] | — | one uniformly random row |
//! | [`Library::field`] | titles | one field of the matched book |

use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::dataset::Dataset;
use crate::fuzzy::{self, Scorer};
use crate::index::{IndexSource, LookupIndex};
use crate::models::{BookRecord, CandidateKind, Field, MatchResult};
use crate::select::{self, GenreTier};

/// Non-fatal lookup outcomes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("type a {kind} to search for")]
    EmptyQuery { kind: CandidateKind },

    #[error("no close {kind} match for '{query}' (cutoff {cutoff}); try lowering the cutoff")]
    NoMatch {
        kind: CandidateKind,
        query: String,
        cutoff: f64,
        /// Size of the candidate list that was searched; 0 means the dataset
        /// has no values for this field at all.
        candidates: usize,
    },

    #[error("matched {kind} '{candidate}' but no row has that value; the lookup index is stale")]
    StaleIndex {
        kind: CandidateKind,
        candidate: String,
    },

    #[error("no '{field}' column in dataset")]
    MissingColumn { field: Field },

    #[error("no valid thumbnail URL for '{title}'")]
    NoThumbnail { title: String },

    #[error("dataset is empty")]
    EmptyDataset,
}

impl LookupError {
    /// Stable machine-readable code used in JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::EmptyQuery { .. } => "empty_query",
            LookupError::NoMatch { .. } => "no_match",
            LookupError::StaleIndex { .. } => "stale_index",
            LookupError::MissingColumn { .. } => "missing_column",
            LookupError::NoThumbnail { .. } => "no_thumbnail",
            LookupError::EmptyDataset => "empty_dataset",
        }
    }
}

/// Display payload for one book, with every missing field replaced by the
/// placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookView {
    pub row: usize,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publisher: String,
    pub published_date: String,
    pub pages: String,
    pub average_rating: String,
    pub description: String,
    pub thumbnail: String,
}

impl From<&BookRecord> for BookView {
    fn from(r: &BookRecord) -> Self {
        Self {
            row: r.row,
            title: r.field(Field::Title).to_string(),
            author: r.field(Field::Author).to_string(),
            genre: r.field(Field::Genre).to_string(),
            publisher: r.field(Field::Publisher).to_string(),
            published_date: r.field(Field::PublishedDate).to_string(),
            pages: r.field(Field::Pages).to_string(),
            average_rating: r.field(Field::AverageRating).to_string(),
            description: r.field(Field::Description).to_string(),
            thumbnail: r.field(Field::Thumbnail).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleHit {
    pub matched: MatchResult,
    pub book: BookView,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorHit {
    pub matched: MatchResult,
    pub total: usize,
    pub books: Vec<BookView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenreHit {
    pub matched: MatchResult,
    pub tier: GenreTier,
    pub total: usize,
    pub books: Vec<BookView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatedBook {
    pub rank: usize,
    pub rating: f64,
    pub book: BookView,
}

/// A single field of a book resolved by title.
#[derive(Debug, Clone, Serialize)]
pub struct FieldHit {
    pub matched: MatchResult,
    pub title: String,
    pub field: Field,
    pub value: String,
}

/// Immutable dataset snapshot plus the lookup index built for it.
#[derive(Debug, Clone)]
pub struct Library {
    dataset: Dataset,
    index: LookupIndex,
    source: IndexSource,
    scorer: Scorer,
    list_limit: usize,
    top_limit: usize,
}

impl Library {
    pub fn new(dataset: Dataset, index: LookupIndex, source: IndexSource) -> Self {
        Self {
            dataset,
            index,
            source,
            scorer: Scorer::default(),
            list_limit: 10,
            top_limit: 10,
        }
    }

    /// Snapshot with an index built straight from the dataset.
    pub fn from_dataset(dataset: Dataset) -> Self {
        let index = LookupIndex::build(&dataset);
        Self::new(dataset, index, IndexSource::Built)
    }

    /// Load the configured dataset and its index.
    pub fn open(config: &Config) -> Result<Self> {
        let dataset = Dataset::load(&config.dataset.path)?;
        let (index, source) = LookupIndex::load_or_build(&dataset, &config.index);
        tracing::info!(
            rows = dataset.len(),
            titles = index.titles.len(),
            authors = index.authors.len(),
            genres = index.genres.len(),
            index = %source,
            "library ready"
        );
        Ok(Self::new(dataset, index, source)
            .with_scorer(config.matching.scorer)
            .with_limits(config.selection.list_limit, config.selection.top_limit))
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_limits(mut self, list_limit: usize, top_limit: usize) -> Self {
        self.list_limit = list_limit;
        self.top_limit = top_limit;
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn index(&self) -> &LookupIndex {
        &self.index
    }

    pub fn index_source(&self) -> &IndexSource {
        &self.source
    }

    fn resolve(
        &self,
        kind: CandidateKind,
        query: &str,
        cutoff: f64,
    ) -> Result<MatchResult, LookupError> {
        if query.trim().is_empty() {
            return Err(LookupError::EmptyQuery { kind });
        }
        let candidates = self.index.candidates(kind);
        match fuzzy::resolve_with(self.scorer, query, candidates, cutoff) {
            Some(m) => {
                tracing::debug!(%kind, query, candidate = %m.candidate, score = m.score, "resolved");
                Ok(MatchResult {
                    candidate: m.candidate,
                    score: m.score,
                    kind,
                })
            }
            None => Err(LookupError::NoMatch {
                kind,
                query: query.to_string(),
                cutoff,
                candidates: candidates.len(),
            }),
        }
    }

    fn resolve_book(
        &self,
        query: &str,
        cutoff: f64,
    ) -> Result<(MatchResult, &BookRecord), LookupError> {
        let matched = self.resolve(CandidateKind::Title, query, cutoff)?;
        match select::by_title(&self.dataset, &matched.candidate) {
            Some(record) => Ok((matched, record)),
            None => {
                tracing::warn!(title = %matched.candidate, "resolved title has no matching row");
                Err(LookupError::StaleIndex {
                    kind: CandidateKind::Title,
                    candidate: matched.candidate,
                })
            }
        }
    }

    /// Resolve a title and return the first row with exactly that title.
    pub fn title(&self, query: &str, cutoff: f64) -> Result<TitleHit, LookupError> {
        let (matched, record) = self.resolve_book(query, cutoff)?;
        Ok(TitleHit {
            matched,
            book: record.into(),
        })
    }

    /// Resolve an author and list their books.
    pub fn author(&self, query: &str, cutoff: f64) -> Result<AuthorHit, LookupError> {
        let matched = self.resolve(CandidateKind::Author, query, cutoff)?;
        let selection = select::by_author(&self.dataset, &matched.candidate, self.list_limit);
        if selection.total == 0 {
            return Err(LookupError::StaleIndex {
                kind: CandidateKind::Author,
                candidate: matched.candidate,
            });
        }
        Ok(AuthorHit {
            matched,
            total: selection.total,
            books: selection.records.into_iter().map(BookView::from).collect(),
        })
    }

    /// Resolve a genre and list books in it.
    pub fn genre(&self, query: &str, cutoff: f64) -> Result<GenreHit, LookupError> {
        let matched = self.resolve(CandidateKind::Genre, query, cutoff)?;
        let found = select::by_genre(&self.dataset, &matched.candidate, self.list_limit);
        if found.selection.total == 0 {
            tracing::warn!(genre = %matched.candidate, "resolved genre has no matching row");
            return Err(LookupError::StaleIndex {
                kind: CandidateKind::Genre,
                candidate: matched.candidate,
            });
        }
        Ok(GenreHit {
            matched,
            tier: found.tier,
            total: found.selection.total,
            books: found
                .selection
                .records
                .into_iter()
                .map(BookView::from)
                .collect(),
        })
    }

    /// Highest-rated books, best first.
    pub fn top_rated(&self) -> Result<Vec<RatedBook>, LookupError> {
        if !self.dataset.has_column(Field::AverageRating) {
            return Err(LookupError::MissingColumn {
                field: Field::AverageRating,
            });
        }
        Ok(select::top_rated(&self.dataset, self.top_limit)
            .into_iter()
            .enumerate()
            .map(|(i, (record, rating))| RatedBook {
                rank: i + 1,
                rating,
                book: record.into(),
            })
            .collect())
    }

    /// One book chosen uniformly at random.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<BookView, LookupError> {
        select::random(&self.dataset, rng)
            .map(BookView::from)
            .ok_or(LookupError::EmptyDataset)
    }

    /// Resolve a title and return one field of that book.
    pub fn field(&self, query: &str, cutoff: f64, field: Field) -> Result<FieldHit, LookupError> {
        let (matched, record) = self.resolve_book(query, cutoff)?;
        Ok(FieldHit {
            title: record.field(Field::Title).to_string(),
            value: record.field(field).to_string(),
            field,
            matched,
        })
    }

    /// Like [`Library::field`] for the thumbnail, but only accepts values
    /// that look like an http(s) URL.
    pub fn thumbnail(&self, query: &str, cutoff: f64) -> Result<FieldHit, LookupError> {
        let (matched, record) = self.resolve_book(query, cutoff)?;
        let title = record.field(Field::Title).to_string();
        match record.thumbnail_url() {
            Some(url) => Ok(FieldHit {
                value: url.to_string(),
                field: Field::Thumbnail,
                title,
                matched,
            }),
            None => Err(LookupError::NoThumbnail { title }),
        }
    }
}
