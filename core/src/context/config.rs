//! Application configuration
//!
//! This module re-exports the shared AppConfig from runlens-types and provides
//! platform-specific defaults and persistence for it.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

pub use runlens_types::{AppConfig, CategoryOrder};

use super::error::ConfigError;

const APP_NAME: &str = "runlens";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Defaults
// ─────────────────────────────────────────────────────────────────────────────

fn default_storage_directory() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
        .join("selection")
}

// ─────────────────────────────────────────────────────────────────────────────
// AppConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for AppConfig persistence and derived settings
pub trait AppConfigExt {
    fn load() -> Self;
    fn load_with_defaults() -> Self;
    fn save(&self) -> Result<(), ConfigError>;
    fn storage_path(&self) -> PathBuf;
    fn excluded_categories(&self) -> BTreeSet<String>;
    fn hover_delay(&self) -> Duration;
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        confy::load(APP_NAME, CONFIG_NAME).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load configuration, using defaults");
            Self::load_with_defaults()
        })
    }

    /// Load with platform-specific defaults (used when no config file exists)
    fn load_with_defaults() -> Self {
        AppConfig::with_storage_directory(default_storage_directory().display().to_string())
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    /// Configured storage directory, or the platform default when unset
    fn storage_path(&self) -> PathBuf {
        if self.storage_directory.trim().is_empty() {
            default_storage_directory()
        } else {
            PathBuf::from(&self.storage_directory)
        }
    }

    fn excluded_categories(&self) -> BTreeSet<String> {
        self.default_excluded_categories.iter().cloned().collect()
    }

    fn hover_delay(&self) -> Duration {
        Duration::from_millis(self.hover_coalesce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_storage_directory_uses_platform_default() {
        let config = AppConfig::default();
        assert!(config.storage_path().ends_with("runlens/selection"));

        let config = AppConfig::with_storage_directory("/tmp/shared".to_string());
        assert_eq!(config.storage_path(), PathBuf::from("/tmp/shared"));
    }

    #[test]
    fn derived_settings() {
        let config = AppConfig::default();
        assert_eq!(config.hover_delay(), Duration::from_millis(100));
        assert!(config.excluded_categories().contains("maintenance"));
    }
}
