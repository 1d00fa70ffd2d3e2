//! TOML configuration for the formdiff CLI
//!
//! Every section is optional; missing keys fall back to the library
//! defaults. Command-line flags are applied on top after loading.

use form_compare::CompareOptions;
use form_extract::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormdiffConfig {
    /// Field extraction settings
    pub extract: ExtractorConfig,
    /// Comparison settings
    pub compare: CompareOptions,
    /// Input and concurrency limits
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// PDFs larger than this are rejected before parsing (default: 10 MiB)
    pub max_document_bytes: u64,
    /// Extractions allowed to run at once on the blocking pool (default: 4)
    pub max_concurrent_extractions: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: 10 * 1024 * 1024,
            max_concurrent_extractions: 4,
        }
    }
}

impl FormdiffConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// The file at `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = self.compare.position_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "compare.position_tolerance must be a non-negative number, got {}",
                tolerance
            )));
        }

        let ratio = self.extract.max_label_distance_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "extract.max_label_distance_ratio must be positive, got {}",
                ratio
            )));
        }

        if self.limits.max_document_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_document_bytes must be greater than zero".to_string(),
            ));
        }
        if self.limits.max_concurrent_extractions == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_concurrent_extractions must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
