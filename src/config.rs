use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub inputs: InputsConfig,
    pub output: OutputConfig,
    pub policy: PolicyConfig,
    pub ratings: RatingsConfig,
}

/// Source files consumed by a pipeline run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub wiki_path: PathBuf,
    pub metadata_path: PathBuf,
    pub ratings_path: PathBuf,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            wiki_path: PathBuf::from("resources/wikipedia.movies.json"),
            metadata_path: PathBuf::from("resources/movies_metadata.csv"),
            ratings_path: PathBuf::from("resources/ratings.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

/// Data-quality thresholds used by the normalizer and reconciler
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Wiki release dates after this day are "modern"
    pub modern_cutoff: NaiveDate,
    /// Metadata release dates before this day are "early"
    pub early_cutoff: NaiveDate,
    /// Columns whose null fraction reaches this value are dropped
    pub null_rate_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            modern_cutoff: NaiveDate::from_ymd_opt(1996, 1, 1).unwrap_or_default(),
            early_cutoff: NaiveDate::from_ymd_opt(1965, 1, 1).unwrap_or_default(),
            null_rate_threshold: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatingsConfig {
    /// Number of rating rows read and persisted per chunk
    pub chunk_size: usize,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1_000_000,
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults when the file is absent
    pub fn load() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.policy.null_rate_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(EtlError::Config(format!(
                "policy.null_rate_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.policy.early_cutoff >= self.policy.modern_cutoff {
            return Err(EtlError::Config(format!(
                "policy.early_cutoff ({}) must be before policy.modern_cutoff ({})",
                self.policy.early_cutoff, self.policy.modern_cutoff
            )));
        }
        if self.ratings.chunk_size == 0 {
            return Err(EtlError::Config(
                "ratings.chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
