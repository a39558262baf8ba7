//! Database builder for fluent configuration
//!
//! Provides a builder pattern for supplying the rule registry, the publish
//! hook and configuration before opening a database.

use std::path::PathBuf;
use std::sync::Arc;
use tariff_core::{TariffError, TariffResult};
use tariff_rules::RuleRegistry;

use super::config::{TariffConfig, CONFIG_FILE_NAME};
use super::Database;
use crate::publish::PublishHook;

// ============================================================================
// Database Builder Pattern
// ============================================================================

/// Builder for Database configuration
///
/// # Three Ways to Open a Database
///
/// ```ignore
/// use tariff_engine::Database;
///
/// // 1. Simple open: config from tariff.toml, no rules
/// let db = Database::open("/data/tariff")?;
///
/// // 2. Builder with rules and an export hook
/// let db = Database::builder()
///     .path("/data/tariff")
///     .rules(registry)
///     .publish_hook(exporter)
///     .open()?;
///
/// // 3. Ephemeral (no files, testing)
/// let db = Database::builder().rules(registry).ephemeral()?;
/// ```
#[derive(Default)]
pub struct DatabaseBuilder {
    /// Data directory (required for open())
    path: Option<PathBuf>,
    /// Explicit configuration; written to tariff.toml on open()
    config: Option<TariffConfig>,
    /// Rules used by validation
    registry: RuleRegistry,
    /// Export collaborator
    publish_hook: Option<Arc<dyn PublishHook>>,
}

impl DatabaseBuilder {
    /// Create new builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set data directory
    ///
    /// Required for `open()`. Use `ephemeral()` for no-file testing.
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Use an explicit configuration instead of `tariff.toml`
    pub fn config(mut self, config: TariffConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the rule registry
    pub fn rules(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the hook called after each approval
    pub fn publish_hook(mut self, hook: impl PublishHook) -> Self {
        self.publish_hook = Some(Arc::new(hook));
        self
    }

    /// Open the database
    ///
    /// Creates the data directory if needed. An explicit configuration is
    /// written to `tariff.toml`; otherwise the file is read, and created
    /// with defaults when missing.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No path was configured (use `.path()` or `.ephemeral()`)
    /// - Directory creation or config file access fails
    /// - The configuration is invalid
    pub fn open(self) -> TariffResult<Arc<Database>> {
        let data_dir = self.path.ok_or_else(|| {
            TariffError::invalid_input(
                "No path specified. Use .path() to set database path, or .ephemeral() for an in-memory database.",
            )
        })?;
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        let cfg = match self.config {
            Some(cfg) => {
                cfg.validate()?;
                cfg.write_to_file(&config_path)?;
                cfg
            }
            None => {
                TariffConfig::write_default_if_missing(&config_path)?;
                TariffConfig::from_file(&config_path)?
            }
        };
        Database::assemble(data_dir, cfg, self.registry, self.publish_hook)
    }

    /// Open an in-memory database
    ///
    /// Any path set on the builder is ignored.
    pub fn ephemeral(self) -> TariffResult<Arc<Database>> {
        Database::assemble(
            PathBuf::new(),
            self.config.unwrap_or_default(),
            self.registry,
            self.publish_hook,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::NoopPublishHook;
    use tariff_core::EntityKind;
    use tariff_rules::NoOverlapping;
    use tempfile::TempDir;

    #[test]
    fn test_open_requires_path() {
        let err = DatabaseBuilder::new().open().unwrap_err();
        assert!(matches!(err, TariffError::InvalidInput(_)));
    }

    #[test]
    fn test_builder_carries_rules() {
        let registry =
            RuleRegistry::new().with_rule(EntityKind::Footnote, NoOverlapping::new("FO4", "overlap"));
        let db = Database::builder()
            .rules(registry)
            .publish_hook(NoopPublishHook)
            .ephemeral()
            .unwrap();
        assert_eq!(db.registry().len(), 1);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let err = Database::builder()
            .path(dir.path())
            .config(TariffConfig {
                max_pending_jobs: 0,
                ..TariffConfig::default()
            })
            .open()
            .unwrap_err();
        assert!(matches!(err, TariffError::Config(_)));
        assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_open_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let db = Database::builder().path(&nested).open().unwrap();
        assert_eq!(db.data_dir(), nested.as_path());
        assert!(nested.join(CONFIG_FILE_NAME).exists());
    }
}
