//! Application configuration.
//!
//! Loaded from `config.toml` in the platform data directory, with
//! environment overrides for the tutor endpoint credentials.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the tutor endpoint URL.
pub const ENV_TUTOR_ENDPOINT_URL: &str = "TUTOR_ENDPOINT_URL";
/// Environment variable overriding the tutor API key.
pub const ENV_TUTOR_API_KEY: &str = "TUTOR_API_KEY";

/// Model requested from the tutor endpoint unless configured otherwise.
pub const DEFAULT_TUTOR_MODEL: &str = "gpt-4o-mini";

/// Which store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process tables, optionally snapshotted to a JSON file
    #[default]
    Memory,
    /// SQLite database file
    Sqlite,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Storage settings
    pub storage: StorageSettings,
    /// Tutor endpoint settings
    pub tutor: TutorSettings,
    /// Leaderboard settings
    pub leaderboard: LeaderboardSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            storage: StorageSettings::default(),
            tutor: TutorSettings::default(),
            leaderboard: LeaderboardSettings::default(),
        }
    }
}

impl AppConfig {
    /// Apply environment overrides for the tutor endpoint.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_TUTOR_ENDPOINT_URL) {
            if !url.trim().is_empty() {
                self.tutor.endpoint_url = url;
            }
        }
        if let Ok(key) = std::env::var(ENV_TUTOR_API_KEY) {
            if !key.trim().is_empty() {
                self.tutor.api_key = key;
            }
        }
    }

    /// Report settings that must be present before talking to the tutor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.tutor.endpoint_url.trim().is_empty() {
            missing.push(ENV_TUTOR_ENDPOINT_URL);
        }
        if self.tutor.api_key.trim().is_empty() {
            missing.push(ENV_TUTOR_API_KEY);
        }

        if missing.is_empty() {
            Ok(())
        } else {
            for name in &missing {
                tracing::error!("Missing required setting: {}", name);
            }
            Err(ConfigError::Missing(missing.join(", ")))
        }
    }
}

/// Storage-related settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Backend selection
    pub backend: StorageBackend,
    /// Database or snapshot file; in-memory only when unset
    pub path: Option<PathBuf>,
}

/// Tutor endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorSettings {
    /// Multi-agent chat function URL
    pub endpoint_url: String,
    /// Bearer key sent with every request
    pub api_key: String,
    /// Model name forwarded to the endpoint
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            api_key: String::new(),
            model: DEFAULT_TUTOR_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Leaderboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardSettings {
    /// Entries shown when no limit is given
    pub default_limit: usize,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self { default_limit: 10 }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "socratic-tutor", "SocraticTutor")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load application configuration from a file, falling back to defaults.
pub fn load_config_from(path: &std::path::Path) -> Result<AppConfig, ConfigError> {
    let mut config = if path.exists() {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?
    } else {
        AppConfig::default()
    };

    config.data_dir = get_data_dir();
    config.apply_env_overrides();

    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save application configuration to a file.
pub fn save_config_to(config: &AppConfig, path: &std::path::Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Missing required settings: {0}")]
    Missing(String),
}
