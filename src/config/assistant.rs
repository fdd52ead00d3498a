/// Assistant configuration
///
/// Defaults are usable as-is; `from_env` overlays `NLQ_*` variables and
/// `validate` rejects values the pipeline cannot honor.
use crate::llm::ollama_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::query::compiler::DEFAULT_TABLE;
use crate::query::plan::Language;
use crate::resolver::index::DEFAULT_TITLE_THRESHOLD;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Complete assistant configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Dataset location
    pub dataset: DatasetConfig,

    /// Entity resolution
    pub resolver: ResolverConfig,

    /// Ranking metrics
    pub ranking: RankingConfig,

    /// Optional oracle
    pub oracle: OracleConfig,

    /// Answer rendering and audit
    pub answer: AnswerConfig,

    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub csv_path: PathBuf,
    pub table_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum score (0-100] for a title to resolve
    pub title_threshold: f64,
    pub suggestion_limit: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Scale combo rankings by the confidence implied by critic and user vote counts
    pub confidence_weight: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Per-attempt timeout (milliseconds)
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// Linear backoff step (milliseconds)
    pub retry_backoff_ms: u64,
    /// Ask the oracle to restyle deterministic answers
    pub paraphrase: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    pub default_language: Language,
    pub audit_capacity: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            resolver: ResolverConfig::default(),
            ranking: RankingConfig::default(),
            oracle: OracleConfig::default(),
            answer: AnswerConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/vgsales.csv"),
            table_name: DEFAULT_TABLE.to_string(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            title_threshold: DEFAULT_TITLE_THRESHOLD,
            suggestion_limit: 5,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { confidence_weight: true }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_ms: 8000,
            max_retries: 2,
            retry_backoff_ms: 800,
            paraphrase: true,
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            default_language: Language::Pt,
            audit_capacity: 1000,
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Parse a numeric override; invalid values are ignored with a warning
fn parse_override<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = key, value = raw, "Ignoring invalid numeric override");
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AssistantConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Load a JSON config file; missing sections keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply `NLQ_*` overrides from any key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("NLQ_DATASET") {
            self.dataset.csv_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("NLQ_ORACLE_URL") {
            self.oracle.base_url = url;
        }
        if let Some(model) = lookup("NLQ_ORACLE_MODEL") {
            self.oracle.model = model;
        }
        if let Some(raw) = lookup("NLQ_ORACLE_TIMEOUT_MS") {
            if let Some(ms) = parse_override("NLQ_ORACLE_TIMEOUT_MS", &raw) {
                self.oracle.timeout_ms = ms;
            }
        }
        if let Some(raw) = lookup("NLQ_ORACLE_RETRIES") {
            if let Some(retries) = parse_override("NLQ_ORACLE_RETRIES", &raw) {
                self.oracle.max_retries = retries;
            }
        }
        if let Some(raw) = lookup("NLQ_ORACLE_ENABLED") {
            match parse_flag(&raw) {
                Some(enabled) => self.oracle.enabled = enabled,
                None => warn!(variable = "NLQ_ORACLE_ENABLED", value = %raw, "Ignoring invalid flag"),
            }
        }
        if let Some(raw) = lookup("NLQ_CONFIDENCE_WEIGHT") {
            match parse_flag(&raw) {
                Some(enabled) => self.ranking.confidence_weight = enabled,
                None => warn!(variable = "NLQ_CONFIDENCE_WEIGHT", value = %raw, "Ignoring invalid flag"),
            }
        }
        if let Some(raw) = lookup("NLQ_LANGUAGE") {
            match Language::parse(&raw) {
                Some(language) => self.answer.default_language = language,
                None => warn!(variable = "NLQ_LANGUAGE", value = %raw, "Ignoring unknown language"),
            }
        }
        if let Some(filter) = lookup("NLQ_LOG") {
            self.log_filter = filter;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.resolver.title_threshold;
        if !(threshold > 0.0 && threshold <= 100.0) {
            bail!("resolver.title_threshold must be in (0, 100], got {}", threshold);
        }
        if self.oracle.timeout_ms == 0 {
            bail!("oracle.timeout_ms must be positive");
        }
        if self.oracle.max_retries > 5 {
            bail!("oracle.max_retries must be at most 5, got {}", self.oracle.max_retries);
        }
        if self.dataset.table_name.trim().is_empty() {
            bail!("dataset.table_name must not be empty");
        }
        Ok(())
    }
}
