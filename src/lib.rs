//! # Book Explorer
//!
//! Fuzzy lookup over a CSV book dataset, plus a chat relay to an external
//! NLU bot server.
//!
//! A query such as `"lord of the rngs"` is resolved against the dataset's
//! unique titles, authors, or genres with an edit-distance similarity
//! score, and the matching rows are selected under a per-field policy.
//!
//! ## Architecture
//!
//! ```text
//! Books.csv ──▶ Dataset (snapshot) ──▶ LookupIndex ◀── index.json (optional)
//!                      │                    │
//!                      └─────────┬──────────┘
//!                                ▼
//!                Library: fuzzy resolve + select
//!                                │
//!                                ▼
//!                          CLI (`books`)          chat relay ──▶ NLU server
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! books title "dune"                 # best title match and its record
//! books author "frank herbert"       # up to 10 books by that author
//! books genre "fantasy"              # books in that genre
//! books top-rated                    # highest average ratings
//! books chat                         # talk to the bot server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`dataset`] | CSV loading into an immutable snapshot |
//! | [`index`] | Candidate lists, precomputed or built |
//! | [`fuzzy`] | Fuzzy resolution against a candidate list |
//! | [`select`] | Row selection for a resolved candidate |
//! | [`lookup`] | Per-action entry points over a [`lookup::Library`] |
//! | [`present`] | CLI text and JSON output |
//! | [`stats`] | Dataset and index summary |
//! | [`chat`] | Relay to the NLU bot server |

pub mod chat;
pub mod config;
pub mod dataset;
pub mod fuzzy;
pub mod index;
pub mod lookup;
pub mod models;
pub mod present;
pub mod select;
pub mod stats;
