//! Fuzzy string resolution.
//!
//! Resolves a free-text query to the single best entry of a candidate list.
//! Both sides are normalized first (lowercased, punctuation folded to spaces,
//! whitespace collapsed) and scored with a [`Scorer`] on a 0–100 scale.
//!
//! The best candidate is returned only when its score reaches the caller's
//! cutoff. Ties go to the candidate that appears first in the list, so the
//! result is deterministic for a given candidate order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Similarity metric used to score a query against a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Normalized Levenshtein ratio.
    #[default]
    Levenshtein,
    /// Normalized Damerau-Levenshtein ratio (transpositions count as one edit).
    Damerau,
    JaroWinkler,
    /// Sørensen–Dice coefficient over character bigrams.
    SorensenDice,
    /// Best of the plain ratio, a substring-window ratio and a token-set
    /// ratio, with the partial scores discounted. Lets last names and
    /// partial titles match ("king" → "Stephen King").
    Weighted,
}

impl Scorer {
    /// Similarity of two strings in `[0, 100]`. Strings that normalize to
    /// nothing score 0 against everything.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        score_normalized(*self, &normalize(a), &normalize(b))
    }
}

/// A candidate that cleared the cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub candidate: String,
    pub score: f64,
}

/// Lowercase, replace non-alphanumeric characters with spaces, and collapse
/// runs of whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn score_normalized(scorer: Scorer, a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let ratio = match scorer {
        Scorer::Levenshtein => strsim::normalized_levenshtein(a, b),
        Scorer::Damerau => strsim::normalized_damerau_levenshtein(a, b),
        Scorer::JaroWinkler => strsim::jaro_winkler(a, b),
        Scorer::SorensenDice => strsim::sorensen_dice(a, b),
        Scorer::Weighted => weighted_ratio(a, b),
    };
    ratio * 100.0
}

/// Inputs must be normalized and non-empty.
fn weighted_ratio(a: &str, b: &str) -> f64 {
    let base = strsim::normalized_levenshtein(a, b);
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    let len_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;

    if len_ratio < 1.5 {
        return base.max(token_set_ratio(a, b) * 0.95);
    }
    let scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    base.max(partial_ratio(a, b) * scale)
        .max(token_set_ratio(a, b) * 0.95 * scale)
}

/// Best ratio of the shorter string against every same-length window of the
/// longer one.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let width = short.chars().count();
    let long: Vec<char> = long.chars().collect();
    if width == 0 || long.is_empty() {
        return 0.0;
    }

    let mut best = 0.0f64;
    for window in long.windows(width) {
        let window: String = window.iter().collect();
        best = best.max(strsim::normalized_levenshtein(short, &window));
        if best >= 1.0 {
            break;
        }
    }
    best
}

/// Compares the shared tokens against each side's full sorted token set, so
/// word order and extra words on one side do not count against a match.
fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let shared: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !shared.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 1.0;
    }

    let shared = shared.join(" ");
    let join = |rest: &[&str]| {
        if shared.is_empty() {
            rest.join(" ")
        } else {
            format!("{} {}", shared, rest.join(" "))
        }
    };
    let full_a = join(&only_a);
    let full_b = join(&only_b);

    strsim::normalized_levenshtein(&shared, &full_a)
        .max(strsim::normalized_levenshtein(&shared, &full_b))
        .max(strsim::normalized_levenshtein(&full_a, &full_b))
}

/// Resolve `query` against `candidates` with the default scorer.
pub fn resolve(query: &str, candidates: &[String], cutoff: f64) -> Option<FuzzyMatch> {
    resolve_with(Scorer::default(), query, candidates, cutoff)
}

/// Resolve `query` against `candidates`, returning the highest-scoring
/// candidate whose score is at least `cutoff`.
///
/// Returns `None` for an empty query, an empty candidate list, or when no
/// candidate reaches the cutoff. The cutoff is used as given.
pub fn resolve_with(
    scorer: Scorer,
    query: &str,
    candidates: &[String],
    cutoff: f64,
) -> Option<FuzzyMatch> {
    if query.trim().is_empty() || candidates.is_empty() {
        return None;
    }

    let query = normalize(query);
    let mut best: Option<(&String, f64)> = None;

    for candidate in candidates {
        let score = score_normalized(scorer, &query, &normalize(candidate));
        // Also rejects every score when the cutoff is NaN.
        if !(score >= cutoff) {
            continue;
        }
        // Strictly greater: earlier candidates win ties.
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    best.map(|(candidate, score)| FuzzyMatch {
        candidate: candidate.clone(),
        score,
    })
}
