//! Engine configuration
//!
//! Settings are read from a `rowql.toml` file. Every field has a default, so
//! an empty file (or no file at all) yields `EngineConfig::default()`.
//!
//! ## Environment Variables
//!
//! The following environment variables override file settings:
//!
//! - `ROWQL_NESTED_ACCESS` - `true`/`false`, whether statistics flatten nested rows
//! - `ROWQL_CURVE_SAMPLES` - number of points sampled along a fitted curve
//!
//! These can be set in a `.env` file next to the config file.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "rowql.toml";

/// Environment variable names
pub const ENV_NESTED_ACCESS: &str = "ROWQL_NESTED_ACCESS";
pub const ENV_CURVE_SAMPLES: &str = "ROWQL_CURVE_SAMPLES";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Flatten nested rows before computing statistics
    pub nested_access: bool,
    /// Table names that refer to the dataset being queried
    pub default_tables: Vec<String>,
    /// Example values reported per categorical column by `describe`
    pub max_example_values: usize,
    /// Sample values reported per column by `info`
    pub max_sample_values: usize,
    /// Points sampled along a fitted regression curve
    pub curve_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nested_access: true,
            default_tables: vec!["data".to_string(), "combined".to_string()],
            max_example_values: 5,
            max_sample_values: 3,
            curve_samples: 100,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?
        } else {
            tracing::debug!(path = %path.display(), "config file not found; using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `rowql.toml` and any `.env` file from a directory.
    pub fn load_from_dir(dir: &Path) -> anyhow::Result<Self> {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }
        Self::load(&dir.join(CONFIG_FILE_NAME))
    }

    /// Apply environment variable overrides to the configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(ENV_NESTED_ACCESS) {
            match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.nested_access = true,
                "0" | "false" | "no" | "off" => self.nested_access = false,
                other => tracing::warn!(value = other, "ignoring invalid {}", ENV_NESTED_ACCESS),
            }
        }

        if let Ok(value) = std::env::var(ENV_CURVE_SAMPLES) {
            match value.trim().parse::<usize>() {
                Ok(samples) if samples > 0 => self.curve_samples = samples,
                _ => tracing::warn!(value = %value, "ignoring invalid {}", ENV_CURVE_SAMPLES),
            }
        }
    }
}
