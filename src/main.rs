//! # Book Explorer CLI (`books`)
//!
//! The `books` binary looks up books in a CSV dataset by fuzzy title,
//! author, or genre, lists top-rated or random picks, and relays chat
//! messages to an external NLU bot server.
//!
//! ## Usage
//!
//! ```bash
//! books --config ./config/books.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `books title "<query>"` | Best-matching title and its full record |
//! | `books author "<query>"` | Books by the best-matching author |
//! | `books genre "<query>"` | Books in the best-matching genre |
//! | `books top-rated` | Highest average ratings |
//! | `books random` | One random recommendation |
//! | `books thumbnail\|pages\|description\|publisher\|published-date\|rating "<title>"` | One field of a book |
//! | `books index build --output <path>` | Write a precomputed lookup index |
//! | `books stats` | Dataset and index summary |
//! | `books chat` | Chat with the NLU bot server |
//!
//! ## Examples
//!
//! ```bash
//! # Fuzzy title lookup with a looser cutoff
//! books title "lord of the rngs" --cutoff 60
//!
//! # Everything by an author, as JSON
//! books --format json author "stephen kng"
//!
//! # Use a different dataset without a config file
//! books --data ./data/Books.csv top-rated
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use book_explorer::models::Field;
use book_explorer::present::{self, OutputFormat};
use book_explorer::{chat, config, dataset, index, lookup, stats};

/// Book Explorer — fuzzy lookup over a CSV book dataset.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used and the
/// dataset is read from `data/Books.csv`.
#[derive(Parser)]
#[command(
    name = "books",
    about = "Book Explorer — fuzzy title, author, and genre lookup over a CSV book dataset",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/books.toml")]
    config: PathBuf,

    /// Dataset CSV, overriding `[dataset].path`.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Precomputed index artifact, overriding `[index].path`.
    #[arg(long = "index", global = true)]
    index_path: Option<PathBuf>,

    /// Output format for lookup results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// A free-text query plus an optional cutoff override.
#[derive(Args)]
struct QueryArgs {
    /// Free-text query, matched fuzzily.
    query: String,

    /// Minimum similarity score (0–100) for a match. Defaults to `[matching].cutoff`.
    #[arg(long, allow_negative_numbers = true)]
    cutoff: Option<f64>,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Find the best-matching title and show its record.
    Title {
        #[command(flatten)]
        q: QueryArgs,

        /// Show a random book when no title matches.
        #[arg(long)]
        suggest: bool,
    },

    /// List books by the best-matching author.
    Author {
        #[command(flatten)]
        q: QueryArgs,
    },

    /// List books in the best-matching genre.
    ///
    /// Rows are matched case-insensitively; if no row has exactly that
    /// genre, rows whose genre contains it are shown instead.
    Genre {
        #[command(flatten)]
        q: QueryArgs,
    },

    /// Show the highest-rated books.
    TopRated,

    /// Recommend one random book.
    Random,

    /// Show the thumbnail URL of the best-matching title.
    Thumbnail {
        #[command(flatten)]
        q: QueryArgs,
    },

    /// Show the page count of the best-matching title.
    Pages {
        #[command(flatten)]
        q: QueryArgs,
    },

    /// Show the description of the best-matching title.
    Description {
        #[command(flatten)]
        q: QueryArgs,
    },

    /// Show the publisher of the best-matching title.
    Publisher {
        #[command(flatten)]
        q: QueryArgs,
    },

    /// Show the publish date of the best-matching title.
    PublishedDate {
        #[command(flatten)]
        q: QueryArgs,
    },

    /// Show the average rating of the best-matching title.
    Rating {
        #[command(flatten)]
        q: QueryArgs,
    },

    /// Manage the precomputed lookup index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Summarize the dataset and lookup index.
    Stats,

    /// Chat with the NLU bot server.
    ///
    /// Reads messages from stdin, one per line. `/history` prints the
    /// transcript and `/quit` ends the session.
    Chat {
        /// Sender id sent with each message. Defaults to a random UUID.
        #[arg(long)]
        sender: Option<String>,

        /// Bot server webhook URL, overriding `[chat].url`.
        #[arg(long)]
        url: Option<String>,
    },
}

/// Index subcommands.
#[derive(Subcommand)]
enum IndexAction {
    /// Build the index from the dataset and write it as JSON.
    ///
    /// The configured `[index].path` is never overwritten.
    Build {
        /// Where to write the artifact.
        #[arg(long)]
        output: PathBuf,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut cfg = config::load_or_minimal(&cli.config)?;
    if let Some(data) = cli.data {
        cfg.dataset.path = data;
    }
    if let Some(path) = cli.index_path {
        cfg.index.path = Some(path);
    }

    // Commands that don't need the library loaded
    match &cli.command {
        Commands::Chat { sender, url } => {
            if let Some(url) = url {
                cfg.chat.url = url.clone();
            }
            return chat::run_chat(&cfg.chat, sender.clone()).await;
        }
        Commands::Index {
            action: IndexAction::Build { output },
        } => {
            let ds = dataset::Dataset::load(&cfg.dataset.path)?;
            return index::run_build(&cfg, &ds, output);
        }
        _ => {}
    }

    let library = lookup::Library::open(&cfg)?;
    let cutoff = |q: &QueryArgs| q.cutoff.unwrap_or(cfg.matching.cutoff);
    let format = cli.format;
    let mut rng = rand::thread_rng();

    match cli.command {
        Commands::Title { q, suggest } => {
            present::run_title(&library, &q.query, cutoff(&q), suggest, format, &mut rng)?;
        }
        Commands::Author { q } => {
            present::run_author(&library, &q.query, cutoff(&q), format)?;
        }
        Commands::Genre { q } => {
            present::run_genre(&library, &q.query, cutoff(&q), format)?;
        }
        Commands::TopRated => {
            present::run_top_rated(&library, format)?;
        }
        Commands::Random => {
            present::run_random(&library, format, &mut rng)?;
        }
        Commands::Thumbnail { q } => {
            present::run_field(&library, &q.query, cutoff(&q), Field::Thumbnail, format)?;
        }
        Commands::Pages { q } => {
            present::run_field(&library, &q.query, cutoff(&q), Field::Pages, format)?;
        }
        Commands::Description { q } => {
            present::run_field(&library, &q.query, cutoff(&q), Field::Description, format)?;
        }
        Commands::Publisher { q } => {
            present::run_field(&library, &q.query, cutoff(&q), Field::Publisher, format)?;
        }
        Commands::PublishedDate { q } => {
            present::run_field(&library, &q.query, cutoff(&q), Field::PublishedDate, format)?;
        }
        Commands::Rating { q } => {
            present::run_field(&library, &q.query, cutoff(&q), Field::AverageRating, format)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg, &library, format)?;
        }
        Commands::Chat { .. } | Commands::Index { .. } => {
            // Handled above (before loading the library)
            unreachable!()
        }
    }

    Ok(())
}
