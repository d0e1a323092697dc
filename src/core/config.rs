//! Configuration module for the backup media extractor
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\backup_media_extractor\config.toml
//! - Linux: ~/.config/backup_media_extractor/config.toml
//! - macOS: ~/Library/Application Support/backup_media_extractor/config.toml
//!
//! The `BACKUP_DIR`, `EXPORT_DIR` and `CSV_OUTPUT` environment variables override
//! the corresponding file settings.

use crate::metadata::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application name used for config directory
const APP_NAME: &str = "backup_media_extractor";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Write the commented default config to `path`, or to the standard location.
///
/// Returns the path that was written.
pub fn write_default_config(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let target = match path {
        Some(p) => p.to_path_buf(),
        None => ensure_config_dir()?.join(CONFIG_FILE_NAME),
    };

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(parent.to_path_buf(), e.to_string()))?;
        }
    }

    fs::write(&target, Config::generate_default_config())
        .map_err(|e| ConfigError::WriteError(target.clone(), e.to_string()))?;

    Ok(target)
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the backup lives
    pub backup: BackupConfig,

    /// Export destination settings
    pub output: OutputConfig,

    /// Which manifest entries are extracted
    pub extraction: ExtractionConfig,

    /// Photos library metadata enrichment
    pub metadata: MetadataConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Backup location configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Backup directory containing Manifest.db (empty = not configured)
    pub directory: PathBuf,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that exported files are copied into
    pub directory: PathBuf,

    /// CSV file listing every exported file
    pub csv_file: PathBuf,

    /// Recreate the DCIM sub-folders (100APPLE, ...) under the export directory
    pub preserve_structure: bool,
}

/// Extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// SQL LIKE pattern selecting candidate paths from Manifest.db
    pub path_pattern: String,

    /// File extensions treated as media (lowercase, without dot)
    pub media_extensions: Vec<String>,
}

/// Photos library metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Enrich exported rows with Photos.sqlite metadata
    pub enabled: bool,

    /// Backup domain holding Photos.sqlite
    pub store_domain: String,

    /// Domain-relative path of Photos.sqlite
    pub store_path: String,

    /// Domain-relative prefix under which library media lives
    pub media_root: String,

    /// Drop assets whose cloud state says the original is not on the device
    pub exclude_cloud_only: bool,

    /// Cloud state values meaning "original present on the device"
    pub local_cloud_states: Vec<i64>,

    /// Cloud state values meaning "cloud-only placeholder"
    pub cloud_only_states: Vec<i64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            csv_file: PathBuf::new(),
            preserve_structure: true,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            path_pattern: "Media/DCIM/%".to_string(),
            media_extensions: ["heic", "jpg", "jpeg", "png", "gif", "mov", "mp4", "m4v", "avi"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl ExtractionConfig {
    /// Check if a file name carries one of the configured media extensions
    pub fn is_media_file(&self, name: &str) -> bool {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        !extension.is_empty()
            && self
                .media_extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&extension))
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            store_domain: "CameraRollDomain".to_string(),
            store_path: "Media/PhotoData/Photos.sqlite".to_string(),
            media_root: "Media/".to_string(),
            exclude_cloud_only: true,
            local_cloud_states: vec![0, 1],
            cloud_only_states: Vec::new(),
        }
    }
}

impl MetadataConfig {
    /// Convert to the metadata index build options
    pub fn to_index_options(&self) -> IndexOptions {
        IndexOptions {
            exclude_cloud_only: self.exclude_cloud_only,
            local_cloud_states: self.local_cloud_states.clone(),
            cloud_only_states: self.cloud_only_states.clone(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./backup_extraction.log"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        Self::from_toml_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./config.toml
    /// 2. ./backup_extractor.toml
    /// 3. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(Self::get_active_config_path()).or_else(|e| match e {
            ConfigError::FileNotFound(_) => Ok(Self::default()),
            other => Err(other),
        })
    }

    /// Get the path where the config file is (or would be) located.
    pub fn get_active_config_path() -> PathBuf {
        let local_paths = [
            PathBuf::from("./config.toml"),
            PathBuf::from("./backup_extractor.toml"),
        ];

        for path in &local_paths {
            if path.exists() {
                return path.clone();
            }
        }

        get_config_path().unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Apply `BACKUP_DIR`, `EXPORT_DIR` and `CSV_OUTPUT` from the environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var_os(key).filter(|v| !v.is_empty()));
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        if let Some(dir) = lookup("BACKUP_DIR") {
            self.backup.directory = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("EXPORT_DIR") {
            self.output.directory = PathBuf::from(dir);
        }
        if let Some(file) = lookup("CSV_OUTPUT") {
            self.output.csv_file = PathBuf::from(file);
        }
    }

    /// Check that everything an extraction run needs is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backup.directory.as_os_str().is_empty() {
            return Err(ConfigError::Missing("backup.directory (BACKUP_DIR)"));
        }
        if self.output.directory.as_os_str().is_empty() {
            return Err(ConfigError::Missing("output.directory (EXPORT_DIR)"));
        }
        if self.output.csv_file.as_os_str().is_empty() {
            return Err(ConfigError::Missing("output.csv_file (CSV_OUTPUT)"));
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// Could not determine config directory
    ConfigDirNotFound,
    /// A setting required for extraction is not set
    Missing(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ParseError(path, err) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(
                    f,
                    "Failed to write config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::Missing(setting) => {
                write!(f, "{} not set", setting)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
