//! Pipeline configuration
//!
//! Typed view of the `[pipeline]` table of the TOML config. Every key is
//! optional:
//!
//! ```toml
//! [pipeline]
//! validate_quality = true
//! refresh = false
//! extract_timeout_secs = 600
//! stale_run_after_secs = 21600
//! themealdb_categories = ["Dessert", "Breakfast"]
//! spoonacular_types = ["dessert", "breakfast"]
//! bucket_dir = "/srv/larder/bucket"
//! ```

use larder_common::config::TomlConfig;
use larder_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable holding the Spoonacular API key
pub const SPOONACULAR_KEY_ENV: &str = "LARDER_SPOONACULAR_API_KEY";

/// Upper bound for `stale_run_after_secs` (ten years)
pub const MAX_STALE_RUN_AFTER_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Enforce quality gates; when false they only log
    pub validate_quality: bool,
    /// Bypass the raw cache and query every source again
    pub refresh: bool,
    pub extract_timeout_secs: u64,
    /// Runs left `running` longer than this are failed at the next start
    pub stale_run_after_secs: u64,
    pub themealdb_categories: Vec<String>,
    pub spoonacular_types: Vec<String>,
    /// Object store bucket; defaults to `<data_dir>/bucket`
    pub bucket_dir: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            validate_quality: true,
            refresh: false,
            extract_timeout_secs: 600,
            stale_run_after_secs: 6 * 60 * 60,
            themealdb_categories: vec!["Dessert".to_string(), "Breakfast".to_string()],
            spoonacular_types: vec!["dessert".to_string(), "breakfast".to_string()],
            bucket_dir: None,
        }
    }
}

impl PipelineSettings {
    /// Build from the `[pipeline]` table of the TOML config
    pub fn from_table(table: &toml::Table) -> Result<Self> {
        let settings: PipelineSettings = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e| Error::Config(format!("Invalid [pipeline] section: {}", e)))?;

        if settings.extract_timeout_secs == 0 {
            return Err(Error::Config(
                "pipeline.extract_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if settings.stale_run_after_secs > MAX_STALE_RUN_AFTER_SECS {
            return Err(Error::Config(format!(
                "pipeline.stale_run_after_secs must be at most {} (got {})",
                MAX_STALE_RUN_AFTER_SECS, settings.stale_run_after_secs
            )));
        }
        Ok(settings)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    /// `None` disables the stale run sweep, as does a value chrono cannot represent
    pub fn stale_run_after(&self) -> Option<chrono::Duration> {
        if self.stale_run_after_secs == 0 {
            return None;
        }
        i64::try_from(self.stale_run_after_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    pub fn bucket_dir(&self, data_dir: &Path) -> PathBuf {
        self.bucket_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("bucket"))
    }
}

/// Spoonacular API key: environment first, then TOML
pub fn resolve_spoonacular_api_key(toml_config: &TomlConfig) -> Option<String> {
    let from_env = std::env::var(SPOONACULAR_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty());
    let from_toml = toml_config
        .spoonacular_api_key
        .clone()
        .filter(|k| !k.trim().is_empty());

    match (from_env, from_toml) {
        (Some(env_key), Some(_)) => {
            warn!(
                "Spoonacular API key set in both {} and config file; using environment",
                SPOONACULAR_KEY_ENV
            );
            Some(env_key)
        }
        (Some(env_key), None) => {
            debug!("Spoonacular API key from {}", SPOONACULAR_KEY_ENV);
            Some(env_key)
        }
        (None, Some(toml_key)) => {
            debug!("Spoonacular API key from config file");
            Some(toml_key)
        }
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let settings = PipelineSettings::default();
        assert!(settings.validate_quality);
        assert!(!settings.refresh);
        assert_eq!(settings.extract_timeout(), Duration::from_secs(600));
        assert_eq!(settings.themealdb_categories, vec!["Dessert", "Breakfast"]);
        assert_eq!(
            settings.bucket_dir(Path::new("/data")),
            PathBuf::from("/data/bucket")
        );
    }

    #[test]
    fn test_from_table_overrides_keys() {
        let table: toml::Table = toml::from_str(
            r#"
validate_quality = false
extract_timeout_secs = 30
stale_run_after_secs = 0
spoonacular_types = ["main course"]
"#,
        )
        .unwrap();

        let settings = PipelineSettings::from_table(&table).unwrap();
        assert!(!settings.validate_quality);
        assert_eq!(settings.extract_timeout(), Duration::from_secs(30));
        assert!(settings.stale_run_after().is_none());
        assert_eq!(settings.spoonacular_types, vec!["main course"]);
        assert_eq!(settings.themealdb_categories, vec!["Dessert", "Breakfast"]);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let table: toml::Table = toml::from_str("extract_timeout_secs = 0").unwrap();
        assert!(PipelineSettings::from_table(&table).is_err());
    }

    #[test]
    fn test_oversized_stale_threshold_rejected() {
        for value in ["100000000000000000", "10000000000000"] {
            let table: toml::Table =
                toml::from_str(&format!("stale_run_after_secs = {}", value)).unwrap();
            let err = PipelineSettings::from_table(&table).unwrap_err();
            assert!(err.to_string().contains("stale_run_after_secs"), "{}", err);
        }

        let table: toml::Table =
            toml::from_str(&format!("stale_run_after_secs = {}", MAX_STALE_RUN_AFTER_SECS)).unwrap();
        let settings = PipelineSettings::from_table(&table).unwrap();
        assert_eq!(
            settings.stale_run_after(),
            Some(chrono::Duration::seconds(MAX_STALE_RUN_AFTER_SECS as i64))
        );
    }

    #[test]
    fn test_unrepresentable_stale_threshold_disables_sweep() {
        let settings = PipelineSettings {
            stale_run_after_secs: 100_000_000_000_000_000,
            ..Default::default()
        };
        assert!(settings.stale_run_after().is_none());

        let settings = PipelineSettings {
            stale_run_after_secs: u64::MAX,
            ..Default::default()
        };
        assert!(settings.stale_run_after().is_none());
    }

    #[test]
    #[serial]
    fn test_api_key_env_beats_toml() {
        let toml_config = TomlConfig {
            spoonacular_api_key: Some("from-toml".to_string()),
            ..Default::default()
        };

        std::env::set_var(SPOONACULAR_KEY_ENV, "from-env");
        assert_eq!(
            resolve_spoonacular_api_key(&toml_config).as_deref(),
            Some("from-env")
        );

        std::env::remove_var(SPOONACULAR_KEY_ENV);
        assert_eq!(
            resolve_spoonacular_api_key(&toml_config).as_deref(),
            Some("from-toml")
        );

        assert!(resolve_spoonacular_api_key(&TomlConfig::default()).is_none());
    }
}
