//! Ingestion settings and configuration loading
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit override path, else ~/.config/kopiyka/rules.toml when present
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! The same file carries the rule tables (see [`crate::rules`]) and an
//! optional `[ingest]` section with the knobs below.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::TransactionSource;
use crate::rules::{RuleSet, DEFAULT_RULES};

/// How table cells are located on a PDF page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStrategy {
    /// Cells are bounded by drawn ruling lines
    Lines,
    /// Cell edges are inferred from word alignment
    Text,
}

/// Geometry tolerances for PDF table detection, in PDF points
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub strategy: TableStrategy,
    /// Parallel edges closer than this are merged onto one coordinate
    pub snap_tolerance: f64,
    /// Collinear edges with gaps up to this are joined
    pub join_tolerance: f64,
    /// Shorter edges are discarded
    pub edge_min_length: f64,
    pub intersection_tolerance: f64,
    /// Text strategy: words needed to infer a column edge
    pub min_words_vertical: usize,
    /// Text strategy: words needed to infer a row edge
    pub min_words_horizontal: usize,
    /// Max horizontal gap between glyphs of one word
    pub x_tolerance: f64,
    /// Max baseline drift between glyphs of one line
    pub y_tolerance: f64,
}

impl TableSettings {
    pub fn lines() -> Self {
        Self {
            strategy: TableStrategy::Lines,
            intersection_tolerance: 5.0,
            ..Self::default()
        }
    }

    pub fn text() -> Self {
        Self {
            strategy: TableStrategy::Text,
            intersection_tolerance: 8.0,
            ..Self::default()
        }
    }
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            strategy: TableStrategy::Lines,
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            edge_min_length: 3.0,
            intersection_tolerance: 3.0,
            min_words_vertical: 3,
            min_words_horizontal: 1,
            x_tolerance: 3.0,
            y_tolerance: 3.0,
        }
    }
}

/// Ingestion knobs shared by the CSV and PDF pipelines
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows with a smaller absolute amount are skipped
    pub min_amount: f64,
    /// Stored descriptions are cut to this many characters
    pub description_limit: usize,
    pub source: TransactionSource,
    /// Share of unreadable characters above which PDF text is discarded
    pub garbage_ratio: f64,
    /// First table pass
    pub lines_table: TableSettings,
    /// Fallback pass for pages without ruled cells
    pub text_table: TableSettings,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_amount: 0.01,
            description_limit: 255,
            source: TransactionSource::Csv,
            garbage_ratio: 0.5,
            lines_table: TableSettings::lines(),
            text_table: TableSettings::text(),
        }
    }
}

/// Everything an ingestor needs, loaded from one file
#[derive(Debug, Clone)]
pub struct KopiykaConfig {
    pub ingest: IngestConfig,
    pub rules: RuleSet,
    /// File the config was read from, `None` for embedded defaults
    pub path: Option<PathBuf>,
}

impl KopiykaConfig {
    /// Load config (override first, then default)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let path = match override_path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let Some(path) = path else {
            return Self::embedded();
        };

        let content = fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        tracing::debug!("Using rules from {}", path.display());

        let mut config = Self::from_toml(&content)?;
        config.path = Some(path);
        Ok(config)
    }

    /// Embedded defaults only
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            ingest: parse_ingest(DEFAULT_RULES)?,
            rules: RuleSet::embedded()?,
            path: None,
        })
    }

    /// Parse an override document, layering its tables over the embedded rules
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(Self {
            ingest: parse_ingest(content)?,
            rules: RuleSet::embedded()?.with_override(content)?,
            path: None,
        })
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kopiyka").join("rules.toml"))
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    ingest: Option<IngestConfig>,
}

fn parse_ingest(content: &str) -> Result<IngestConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;
    let ingest = raw.ingest.unwrap_or_default();

    if !(0.0..=1.0).contains(&ingest.garbage_ratio) {
        return Err(Error::Config(format!(
            "garbage_ratio must be between 0 and 1, got {}",
            ingest.garbage_ratio
        )));
    }
    if ingest.description_limit == 0 {
        return Err(Error::Config(
            "description_limit must be positive".to_string(),
        ));
    }

    Ok(ingest)
}
