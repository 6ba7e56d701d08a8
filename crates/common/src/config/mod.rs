//! Configuration management for DocForge components
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hard ceiling on retrieval window expansions.
pub const MAX_EXPANSION_CEILING: u32 = 4;

/// Store location used when `store.path` is unset.
pub const DEFAULT_STORE_PATH: &str = "data/chunks.json";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Document discovery and ingestion pipeline
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Section-aware segmentation
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// BM25 constants
    #[serde(default)]
    pub lexical: LexicalConfig,

    /// Additive re-ranking weights
    #[serde(default)]
    pub boosts: BoostConfig,

    /// Candidate window and expansion policy
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Deterministic value extraction
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Context assembly for the answer generator
    #[serde(default)]
    pub context: ContextConfig,

    /// Chunk store persistence
    #[serde(default)]
    pub store: StoreConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Directory scanned by the ingestion binary
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// Documents processed concurrently
    #[serde(default = "default_max_parallel_documents")]
    pub max_parallel_documents: usize,

    /// Skip documents whose content hash is already stored
    #[serde(default = "default_true")]
    pub skip_unchanged: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmenterConfig {
    /// Token ceiling for non-atomic chunks
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Lists at or under this size are kept whole (atomic)
    #[serde(default = "default_max_tokens")]
    pub list_max_tokens: usize,

    /// Preceding siblings inspected for a table caption
    #[serde(default = "default_caption_lookback")]
    pub caption_lookback: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LexicalConfig {
    /// Term-frequency saturation
    #[serde(default = "default_k1")]
    pub k1: f64,

    /// Length normalization
    #[serde(default = "default_b")]
    pub b: f64,

    /// Weight of a section-title hit relative to a body hit
    #[serde(default = "default_section_title_multiplier")]
    pub section_title_multiplier: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoostConfig {
    #[serde(default = "default_boost_section_title")]
    pub section_title: f64,

    #[serde(default = "default_boost_table")]
    pub table: f64,

    /// Per shared keyword (length > 3) between table title and query
    #[serde(default = "default_boost_table_title_keyword")]
    pub table_title_keyword: f64,

    /// Per entity category shared with the query intent
    #[serde(default = "default_boost_entity")]
    pub entity_match: f64,

    /// Per unit shared with the units implied by the query intent
    #[serde(default = "default_boost_unit")]
    pub unit_match: f64,

    #[serde(default = "default_boost_atomic")]
    pub atomic: f64,

    /// Applied when the query expects a number and the chunk carries one
    #[serde(default = "default_boost_numeric_content")]
    pub numeric_content: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Default number of ranked chunks returned
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Expand the window while fewer candidates than this are found
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,

    /// Expand the window while the mean of the top-3 final scores is below this
    #[serde(default = "default_score_floor")]
    pub score_floor: f64,

    /// Window growth per expansion
    #[serde(default = "default_expansion_factor")]
    pub expansion_factor: f64,

    /// Maximum number of expansions
    #[serde(default = "default_max_expansions")]
    pub max_expansions: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Top-ranked chunks scanned for a literal value
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContextConfig {
    /// Token budget for assembled excerpts
    #[serde(default = "default_context_max_tokens")]
    pub max_tokens: usize,

    /// Present chunks sharing a section path together
    #[serde(default = "default_true")]
    pub group_by_section: bool,

    /// Share of distinct query terms the top chunk must contain before an
    /// answer without an extracted value is reported as found
    #[serde(default = "default_min_term_coverage")]
    pub min_term_coverage: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// JSON snapshot location; the binaries fall back to `data/chunks.json`
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name attached to startup logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_documents_dir() -> PathBuf { PathBuf::from("documents") }
fn default_max_parallel_documents() -> usize { 4 }
fn default_true() -> bool { true }
fn default_max_tokens() -> usize { 300 }
fn default_caption_lookback() -> usize { 3 }
fn default_k1() -> f64 { 1.5 }
fn default_b() -> f64 { 0.75 }
fn default_section_title_multiplier() -> f64 { 2.0 }
fn default_boost_section_title() -> f64 { 5.0 }
fn default_boost_table() -> f64 { 8.0 }
fn default_boost_table_title_keyword() -> f64 { 3.0 }
fn default_boost_entity() -> f64 { 4.0 }
fn default_boost_unit() -> f64 { 2.0 }
fn default_boost_atomic() -> f64 { 3.0 }
fn default_boost_numeric_content() -> f64 { 1.0 }
fn default_top_k() -> usize { 8 }
fn default_min_candidates() -> usize { 3 }
fn default_score_floor() -> f64 { 1.0 }
fn default_expansion_factor() -> f64 { 2.0 }
fn default_max_expansions() -> u32 { 2 }
fn default_max_candidates() -> usize { 5 }
fn default_context_max_tokens() -> usize { 3000 }
fn default_min_term_coverage() -> f64 { 0.6 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "docforge".to_string() }

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            max_parallel_documents: default_max_parallel_documents(),
            skip_unchanged: true,
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            list_max_tokens: default_max_tokens(),
            caption_lookback: default_caption_lookback(),
        }
    }
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            section_title_multiplier: default_section_title_multiplier(),
        }
    }
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            section_title: default_boost_section_title(),
            table: default_boost_table(),
            table_title_keyword: default_boost_table_title_keyword(),
            entity_match: default_boost_entity(),
            unit_match: default_boost_unit(),
            atomic: default_boost_atomic(),
            numeric_content: default_boost_numeric_content(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_candidates: default_min_candidates(),
            score_floor: default_score_floor(),
            expansion_factor: default_expansion_factor(),
            max_expansions: default_max_expansions(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_candidates: default_max_candidates(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_context_max_tokens(),
            group_by_section: true,
            min_term_coverage: default_min_term_coverage(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__LEXICAL__K1=1.2
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific config file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings that would break ranking or termination guarantees.
    pub fn validate(&self) -> Result<()> {
        let boosts = [
            ("boosts.section_title", self.boosts.section_title),
            ("boosts.table", self.boosts.table),
            ("boosts.table_title_keyword", self.boosts.table_title_keyword),
            ("boosts.entity_match", self.boosts.entity_match),
            ("boosts.unit_match", self.boosts.unit_match),
            ("boosts.atomic", self.boosts.atomic),
            ("boosts.numeric_content", self.boosts.numeric_content),
            ("lexical.section_title_multiplier", self.lexical.section_title_multiplier),
        ];
        for (field, weight) in boosts {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(field, "weight must be a non-negative number"));
            }
        }

        if !(0.0..=1.0).contains(&self.lexical.b) {
            return Err(invalid("lexical.b", "must be within [0, 1]"));
        }
        if !self.lexical.k1.is_finite() || self.lexical.k1 < 0.0 {
            return Err(invalid("lexical.k1", "must be non-negative"));
        }
        if self.segmenter.max_tokens == 0 {
            return Err(invalid("segmenter.max_tokens", "must be greater than zero"));
        }
        if self.retrieval.top_k == 0 {
            return Err(invalid("retrieval.top_k", "must be greater than zero"));
        }
        if !self.retrieval.expansion_factor.is_finite() || self.retrieval.expansion_factor <= 1.0 {
            return Err(invalid("retrieval.expansion_factor", "must be greater than 1"));
        }
        if !self.retrieval.score_floor.is_finite() || self.retrieval.score_floor < 0.0 {
            return Err(invalid("retrieval.score_floor", "must be a non-negative number"));
        }
        if !(0.0..=1.0).contains(&self.context.min_term_coverage) {
            return Err(invalid("context.min_term_coverage", "must be within [0, 1]"));
        }
        if self.retrieval.max_expansions > MAX_EXPANSION_CEILING {
            return Err(invalid(
                "retrieval.max_expansions",
                &format!("must not exceed {}", MAX_EXPANSION_CEILING),
            ));
        }
        if self.ingestion.max_parallel_documents == 0 {
            return Err(invalid("ingestion.max_parallel_documents", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> AppError {
    AppError::Validation {
        message: format!("{}: {}", field, message),
        field: Some(field.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.segmenter.max_tokens, 300);
        assert_eq!(config.lexical.k1, 1.5);
        assert_eq!(config.lexical.b, 0.75);
        assert_eq!(config.boosts.table, 8.0);
        assert_eq!(config.retrieval.max_expansions, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_boost_rejected() {
        let mut config = AppConfig::default();
        config.boosts.atomic = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("boosts.atomic"));
    }

    #[test]
    fn test_expansion_ceiling_enforced() {
        let mut config = AppConfig::default();
        config.retrieval.max_expansions = MAX_EXPANSION_CEILING + 1;
        assert!(config.validate().is_err());

        config.retrieval.max_expansions = 1;
        config.retrieval.expansion_factor = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_settings_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.score_floor = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retrieval.score_floor"));

        let mut config = AppConfig::default();
        config.retrieval.expansion_factor = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retrieval.expansion_factor"));

        let mut config = AppConfig::default();
        config.retrieval.expansion_factor = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.context.min_term_coverage = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("context.min_term_coverage"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docforge.json");
        std::fs::write(&path, r#"{ "lexical": { "k1": 1.2 } }"#).unwrap();

        let config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.lexical.k1, 1.2);
        assert_eq!(config.lexical.b, 0.75);
        assert_eq!(config.boosts.entity_match, 4.0);
    }
}
