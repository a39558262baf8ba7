//! Database configuration via `tariff.toml`
//!
//! On first open, a default `tariff.toml` is created in the data directory.
//! To change settings, edit the file and reopen the database.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tariff_concurrency::PartitionScheme;
use tariff_core::{TariffError, TariffResult};

/// Config file name placed in the database data directory.
pub const CONFIG_FILE_NAME: &str = "tariff.toml";

/// Database configuration loaded from `tariff.toml`.
///
/// # Example
///
/// ```toml
/// # Partition scheme: "SEED_FIRST" (default), "SEED_ONLY" or "REVISION_ONLY"
/// partition_scheme = "SEED_FIRST"
/// skip_validation = false
/// max_pending_jobs = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffConfig {
    /// Partition scheme name, see [`PartitionScheme::from_name`].
    #[serde(default = "default_partition_scheme")]
    pub partition_scheme: String,
    /// Allow submitting workbaskets without passing checks.
    #[serde(default)]
    pub skip_validation: bool,
    /// Maximum number of validation jobs waiting for results.
    #[serde(default = "default_max_pending_jobs")]
    pub max_pending_jobs: usize,
}

fn default_partition_scheme() -> String {
    "SEED_FIRST".to_string()
}

fn default_max_pending_jobs() -> usize {
    64
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            partition_scheme: default_partition_scheme(),
            skip_validation: false,
            max_pending_jobs: default_max_pending_jobs(),
        }
    }
}

impl TariffConfig {
    /// Parse the partition scheme name.
    ///
    /// # Errors
    ///
    /// Returns `TariffError::Config` for an unknown scheme name.
    pub fn partition_scheme(&self) -> TariffResult<PartitionScheme> {
        PartitionScheme::from_name(&self.partition_scheme)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Tariff database configuration
#
# Partition scheme applied when a workbasket is approved:
#   "SEED_FIRST"    = first approval becomes the seed file, later ones revisions
#   "SEED_ONLY"     = every approval lands in the seed partition
#   "REVISION_ONLY" = every approval lands in the revision partition
partition_scheme = "SEED_FIRST"

# Allow workbaskets to be submitted without passing business rule checks.
skip_validation = false

# Maximum number of validation jobs awaiting results (default: 64).
max_pending_jobs = 64
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names an
    /// unknown partition scheme.
    pub fn from_file(path: &Path) -> TariffResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TariffConfig = toml::from_str(&content).map_err(|e| {
            TariffError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> TariffResult<()> {
        self.partition_scheme()?;
        if self.max_pending_jobs == 0 {
            return Err(TariffError::config("max_pending_jobs must be at least 1"));
        }
        Ok(())
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> TariffResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> TariffResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TariffError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
