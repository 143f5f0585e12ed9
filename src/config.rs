use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::fuzzy::Scorer;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexConfig {
    /// Precomputed index artifact. Built on the fly when unset or unreadable.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Reject an artifact whose dataset tag disagrees with the loaded dataset.
    #[serde(default)]
    pub verify: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,
    #[serde(default)]
    pub scorer: Scorer,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            cutoff: default_cutoff(),
            scorer: Scorer::default(),
        }
    }
}

fn default_cutoff() -> f64 {
    75.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct SelectionConfig {
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            list_limit: default_list_limit(),
            top_limit: default_top_limit(),
        }
    }
}

fn default_list_limit() -> usize {
    10
}
fn default_top_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: default_chat_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_chat_url() -> String {
    "http://localhost:5005/webhooks/rest/webhook".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    2
}

impl Config {
    /// Configuration used when no config file exists: `data/Books.csv`,
    /// no precomputed index, default matching and selection settings.
    pub fn minimal() -> Self {
        Self {
            dataset: DatasetConfig {
                path: PathBuf::from("data/Books.csv"),
            },
            index: IndexConfig::default(),
            matching: MatchingConfig::default(),
            selection: SelectionConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to [`Config::minimal`].
/// A file that exists but fails to parse or validate is still an error.
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.selection.list_limit == 0 {
        anyhow::bail!("selection.list_limit must be > 0");
    }
    if config.selection.top_limit == 0 {
        anyhow::bail!("selection.top_limit must be > 0");
    }

    // Cutoff is not clamped to 0..=100.
    if config.matching.cutoff.is_nan() {
        anyhow::bail!("matching.cutoff must be a number");
    }

    if config.chat.timeout_secs == 0 {
        anyhow::bail!("chat.timeout_secs must be > 0");
    }
    if !config.chat.url.starts_with("http://") && !config.chat.url.starts_with("https://") {
        anyhow::bail!(
            "chat.url must be an http(s) URL, got '{}'",
            config.chat.url
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let cfg = parse("[dataset]\npath = \"books.csv\"\n").unwrap();
        assert_eq!(cfg.dataset.path, PathBuf::from("books.csv"));
        assert!(cfg.index.path.is_none());
        assert!(!cfg.index.verify);
        assert_eq!(cfg.matching.cutoff, 75.0);
        assert_eq!(cfg.matching.scorer, Scorer::Levenshtein);
        assert_eq!(cfg.selection.list_limit, 10);
        assert_eq!(cfg.selection.top_limit, 10);
        assert_eq!(cfg.chat.max_retries, 2);
    }

    #[test]
    fn scorer_parses_snake_case() {
        let cfg = parse(
            "[dataset]\npath = \"b.csv\"\n\n[matching]\ncutoff = 60\nscorer = \"jaro_winkler\"\n",
        )
        .unwrap();
        assert_eq!(cfg.matching.scorer, Scorer::JaroWinkler);
        assert_eq!(cfg.matching.cutoff, 60.0);

        let cfg = parse("[dataset]\npath = \"b.csv\"\n\n[matching]\nscorer = \"weighted\"\n").unwrap();
        assert_eq!(cfg.matching.scorer, Scorer::Weighted);
    }

    #[test]
    fn cutoff_out_of_range_is_accepted() {
        let cfg = parse("[dataset]\npath = \"b.csv\"\n\n[matching]\ncutoff = 150\n").unwrap();
        assert_eq!(cfg.matching.cutoff, 150.0);
    }

    #[test]
    fn zero_list_limit_rejected() {
        let err = parse("[dataset]\npath = \"b.csv\"\n\n[selection]\nlist_limit = 0\n")
            .unwrap_err();
        assert!(err.to_string().contains("list_limit"));
    }

    #[test]
    fn non_http_chat_url_rejected() {
        let err =
            parse("[dataset]\npath = \"b.csv\"\n\n[chat]\nurl = \"localhost:5005\"\n").unwrap_err();
        assert!(err.to_string().contains("chat.url"));
    }

    #[test]
    fn missing_file_falls_back_to_minimal() {
        let cfg = load_or_minimal(Path::new("/nonexistent/books.toml")).unwrap();
        assert_eq!(cfg.dataset.path, PathBuf::from("data/Books.csv"));
    }
}
