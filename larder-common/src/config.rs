//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `LARDER_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LARDER_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "larder.db";

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Parsed TOML configuration file
///
/// `pipeline` and `quality` are kept as raw tables; the ETL crate owns their
/// typed shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub spoonacular_api_key: Option<String>,
    #[serde(default)]
    pub pipeline: toml::Table,
    #[serde(default)]
    pub quality: toml::Table,
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
        }
    }
}

/// Resolves the root folder following the documented priority order
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            config_path: None,
        }
    }

    /// Command-line override (priority 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Explicit TOML file instead of the platform search path
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        let config_path = self.config_path.clone().or_else(config_file_path);
        if let Some(config_path) = config_path {
            match load_toml_config(&config_path) {
                Ok(config) => {
                    if let Some(root) = config.root_folder {
                        debug!(module = %self.module_name, "Root folder from {}", config_path.display());
                        return PathBuf::from(root);
                    }
                }
                Err(e) => warn!("Ignoring config file {}: {}", config_path.display(), e),
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout on first run
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.data_dir())?;
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    /// Parent of `raw/`, `processed/` and the object store bucket
    pub fn data_dir(&self) -> PathBuf {
        self.root_folder.join("data")
    }
}

/// Locate the TOML config file for the platform, if one exists
///
/// Linux checks `~/.config/larder/config.toml`, then `/etc/larder/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("larder").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/larder/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the TOML config, degrading to defaults when absent or invalid
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let path = match path.map(Path::to_path_buf).or_else(config_file_path) {
        Some(path) => path,
        None => {
            debug!("No config file found, using defaults");
            return TomlConfig::default();
        }
    };

    match load_toml_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("larder"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/larder"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("larder"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/larder"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("larder"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\larder"))
    } else {
        PathBuf::from("./larder_data")
    }
}
