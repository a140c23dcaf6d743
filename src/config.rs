use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use lesson_sync_core::classify::DEFAULT_NAMESPACE;
use lesson_sync_core::cloze::{ClozeParams, DEFAULT_MAX_SIMILARITY};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub content: ContentConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub dictation: DictationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Local mirror of the object namespace.
#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    pub root: PathBuf,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_include_globs() -> Vec<String> {
    vec![format!("{}/**", DEFAULT_NAMESPACE)]
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregatorConfig {
    /// Optimistic-transaction attempts per event.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Linear backoff step between attempts.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    8
}
fn default_backoff_ms() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct DictationConfig {
    #[serde(default = "default_max_similarity")]
    pub max_similarity: f64,
    #[serde(default = "default_min_passage_chars")]
    pub min_passage_chars: usize,
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,
    #[serde(default = "default_min_pair_chars")]
    pub min_pair_chars: usize,
    #[serde(default = "default_long_snippet_chars")]
    pub long_snippet_chars: usize,
    #[serde(default = "default_four_blank_chars")]
    pub four_blank_chars: usize,
    #[serde(default = "default_max_pair_chars")]
    pub max_pair_chars: usize,
}

impl Default for DictationConfig {
    fn default() -> Self {
        Self {
            max_similarity: default_max_similarity(),
            min_passage_chars: default_min_passage_chars(),
            min_sentence_chars: default_min_sentence_chars(),
            min_pair_chars: default_min_pair_chars(),
            long_snippet_chars: default_long_snippet_chars(),
            four_blank_chars: default_four_blank_chars(),
            max_pair_chars: default_max_pair_chars(),
        }
    }
}

fn default_max_similarity() -> f64 {
    DEFAULT_MAX_SIMILARITY
}
fn default_min_passage_chars() -> usize {
    20
}
fn default_min_sentence_chars() -> usize {
    20
}
fn default_min_pair_chars() -> usize {
    40
}
fn default_long_snippet_chars() -> usize {
    80
}
fn default_four_blank_chars() -> usize {
    120
}
fn default_max_pair_chars() -> usize {
    260
}

impl DictationConfig {
    pub fn cloze_params(&self) -> ClozeParams {
        ClozeParams {
            max_similarity: self.max_similarity,
            min_passage_chars: self.min_passage_chars,
            min_sentence_chars: self.min_sentence_chars,
            min_pair_chars: self.min_pair_chars,
            long_snippet_chars: self.long_snippet_chars,
            four_blank_chars: self.four_blank_chars,
            max_pair_chars: self.max_pair_chars,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }
    if config.content.root.as_os_str().is_empty() {
        anyhow::bail!("content.root must not be empty");
    }

    let ns = &config.content.namespace;
    if ns.is_empty() || ns.contains('/') {
        anyhow::bail!("content.namespace must be a single non-empty path segment, got '{}'", ns);
    }

    if config.aggregator.max_attempts < 1 {
        anyhow::bail!("aggregator.max_attempts must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.dictation.max_similarity) {
        anyhow::bail!("dictation.max_similarity must be in [0.0, 1.0]");
    }

    Ok(())
}
