//! CLI output for lookup actions.
//!
//! Each `run_*` function calls one [`Library`] action and prints the result
//! to stdout, either as plain text or as JSON. Lookup misses are printed as
//! warnings and are not process errors: the command still exits 0.
//!
//! JSON output prints the action's payload on success and an error object
//! on a miss:
//!
//! ```json
//! { "error": { "code": "no_match", "message": "no close title match for 'x' (cutoff 75)..." } }
//! ```

use anyhow::Result;
use rand::Rng;
use serde::Serialize;

use crate::lookup::{
    AuthorHit, BookView, FieldHit, GenreHit, Library, LookupError, RatedBook, TitleHit,
};
use crate::models::{Field, PLACEHOLDER};
use crate::select::GenreTier;

/// Output format for lookup commands.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a BookView>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_miss(format: OutputFormat, err: &LookupError, suggestion: Option<&BookView>) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&ErrorEnvelope {
            error: ErrorBody {
                code: err.code(),
                message: err.to_string(),
                suggestion,
            },
        }),
        OutputFormat::Text => {
            println!("warning: {}", err);
            if let LookupError::NoMatch { candidates: 0, kind, .. } = err {
                println!("  (the dataset has no {} values)", kind);
            }
            if let Some(book) = suggestion {
                println!();
                println!("Showing a random suggestion instead:");
                print!("{}", render_book(book));
            }
            Ok(())
        }
    }
}

/// Full plain-text block for one book. Description is shown only when
/// present and thumbnail only when it is a URL.
pub fn render_book(book: &BookView) -> String {
    let mut out = String::new();
    let lines = [
        (Field::Title, &book.title),
        (Field::Author, &book.author),
        (Field::Genre, &book.genre),
        (Field::Publisher, &book.publisher),
        (Field::PublishedDate, &book.published_date),
        (Field::Pages, &book.pages),
        (Field::AverageRating, &book.average_rating),
    ];
    for (field, value) in lines {
        out.push_str(&format!("{:<16}{}\n", format!("{}:", field.label()), value));
    }
    if book.description != PLACEHOLDER {
        out.push_str("Description:\n");
        for line in book.description.lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }
    if book.thumbnail.starts_with("http") {
        out.push_str(&format!("{:<16}{}\n", "Thumbnail:", book.thumbnail));
    }
    out
}

fn matched_line(kind: &str, candidate: &str, score: f64) -> String {
    format!("Matched {}: {} (score: {:.1})", kind, candidate, score)
}

pub fn run_title<R: Rng + ?Sized>(
    library: &Library,
    query: &str,
    cutoff: f64,
    suggest: bool,
    format: OutputFormat,
    rng: &mut R,
) -> Result<()> {
    match library.title(query, cutoff) {
        Ok(hit) => print_title(&hit, format),
        Err(err) => {
            let suggestion = match (&err, suggest) {
                (LookupError::NoMatch { .. }, true) => library.random(rng).ok(),
                _ => None,
            };
            print_miss(format, &err, suggestion.as_ref())
        }
    }
}

fn print_title(hit: &TitleHit, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(hit);
    }
    println!("{}", matched_line("title", &hit.matched.candidate, hit.matched.score));
    println!();
    print!("{}", render_book(&hit.book));
    Ok(())
}

pub fn run_author(library: &Library, query: &str, cutoff: f64, format: OutputFormat) -> Result<()> {
    match library.author(query, cutoff) {
        Ok(hit) => print_author(&hit, format),
        Err(err) => print_miss(format, &err, None),
    }
}

fn print_author(hit: &AuthorHit, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(hit);
    }
    let author = &hit.matched.candidate;
    println!("{}", matched_line("author", author, hit.matched.score));
    println!(
        "Found {} book{} by {}. Showing up to {}:",
        hit.total,
        if hit.total == 1 { "" } else { "s" },
        author,
        hit.books.len()
    );
    for book in &hit.books {
        println!("  - {} ({})", book.title, book.published_date);
    }
    Ok(())
}

pub fn run_genre(library: &Library, query: &str, cutoff: f64, format: OutputFormat) -> Result<()> {
    match library.genre(query, cutoff) {
        Ok(hit) => print_genre(&hit, format),
        Err(err) => print_miss(format, &err, None),
    }
}

fn print_genre(hit: &GenreHit, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(hit);
    }
    let genre = &hit.matched.candidate;
    println!("{}", matched_line("genre", genre, hit.matched.score));
    if hit.tier == GenreTier::Contains {
        println!("No books with exactly this genre; showing genres that contain it.");
    }
    println!(
        "Found {} book{} in genre '{}'. Showing up to {}:",
        hit.total,
        if hit.total == 1 { "" } else { "s" },
        genre,
        hit.books.len()
    );
    for book in &hit.books {
        println!(
            "  - {} by {} (rating: {})",
            book.title, book.author, book.average_rating
        );
    }
    Ok(())
}

pub fn run_top_rated(library: &Library, format: OutputFormat) -> Result<()> {
    match library.top_rated() {
        Ok(top) => print_top_rated(&top, format),
        Err(err) => print_miss(format, &err, None),
    }
}

fn print_top_rated(top: &[RatedBook], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&top);
    }
    if top.is_empty() {
        println!("No books have a numeric average_rating.");
        return Ok(());
    }
    println!("Top rated books (by average_rating):");
    for entry in top {
        println!(
            "{}. [{}] {} by {}",
            entry.rank, entry.book.average_rating, entry.book.title, entry.book.author
        );
    }
    Ok(())
}

pub fn run_random<R: Rng + ?Sized>(library: &Library, format: OutputFormat, rng: &mut R) -> Result<()> {
    match library.random(rng) {
        Ok(book) => {
            if format == OutputFormat::Json {
                return print_json(&book);
            }
            println!("Here's a random recommendation:");
            println!();
            print!("{}", render_book(&book));
            Ok(())
        }
        Err(err) => print_miss(format, &err, None),
    }
}

pub fn run_field(
    library: &Library,
    query: &str,
    cutoff: f64,
    field: Field,
    format: OutputFormat,
) -> Result<()> {
    let result = match field {
        Field::Thumbnail => library.thumbnail(query, cutoff),
        _ => library.field(query, cutoff, field),
    };
    match result {
        Ok(hit) => print_field(&hit, format),
        Err(err) => print_miss(format, &err, None),
    }
}

fn print_field(hit: &FieldHit, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(hit);
    }
    println!("{}", matched_line("title", &hit.matched.candidate, hit.matched.score));
    match hit.field {
        Field::Description => {
            println!("Description of {}:", hit.title);
            println!("{}", hit.value);
        }
        Field::Pages => println!("{}: {} pages", hit.title, hit.value),
        other => println!("{} for {}: {}", other.label(), hit.title, hit.value),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::models::BookRecord;

    fn view(description: Option<&str>, thumbnail: Option<&str>) -> BookView {
        let record = BookRecord {
            title: Some("Dune".into()),
            description: description.map(Into::into),
            thumbnail: thumbnail.map(Into::into),
            ..Default::default()
        };
        BookView::from(&record)
    }

    #[test]
    fn render_book_substitutes_placeholder() {
        let out = render_book(&view(None, None));
        assert!(out.contains("Title:          Dune"));
        assert!(out.contains("Author:         N/A"));
        assert!(!out.contains("Description"));
        assert!(!out.contains("Thumbnail"));
    }

    #[test]
    fn render_book_shows_description_and_url() {
        let out = render_book(&view(Some("Spice.\nSand."), Some("https://img/d.png")));
        assert!(out.contains("Description:\n  Spice.\n  Sand.\n"));
        assert!(out.contains("Thumbnail:      https://img/d.png"));
    }

    #[test]
    fn render_book_hides_non_url_thumbnail() {
        let out = render_book(&view(None, Some("cover.png")));
        assert!(!out.contains("cover.png"));
    }

    #[test]
    fn error_envelope_shape() {
        let err = LookupError::EmptyDataset;
        let json = serde_json::to_value(ErrorEnvelope {
            error: ErrorBody {
                code: err.code(),
                message: err.to_string(),
                suggestion: None,
            },
        })
        .unwrap();
        assert_eq!(json["error"]["code"], "empty_dataset");
        assert!(json["error"].get("suggestion").is_none());
    }

    #[test]
    fn library_payloads_serialize() {
        let ds = Dataset::from_csv_bytes(b"title,author\nDune,Frank Herbert\n").unwrap();
        let lib = Library::from_dataset(ds);
        let hit = lib.title("Dune", 90.0).unwrap();
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["matched"]["kind"], "title");
        assert_eq!(json["book"]["genre"], PLACEHOLDER);
    }
}
