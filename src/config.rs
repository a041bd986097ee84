use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::registry::DEFAULT_NAMESPACE_PREFIX;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "TRANSIENT_TABLES_CONFIG";

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl From<&str> for LogFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text, // Default to text
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level filter: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Database used by [`crate::SqliteDatabase::open_with`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database file; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub foreign_keys: bool,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            foreign_keys: true,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_namespace_prefix() -> String {
    DEFAULT_NAMESPACE_PREFIX.to_string()
}

/// Transient tables configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransientConfig {
    /// Prefix of the namespace each context binds its models in
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TransientConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: default_namespace_prefix(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TransientConfig {
    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "transient-tables", "transient-tables")
            .context("Failed to determine project directories")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Load config from `$TRANSIENT_TABLES_CONFIG`, then the default path,
    /// or return defaults if neither exists
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load_from(Path::new(&path));
        }

        let path = Self::config_path()?;
        if path.exists() {
            return Self::load_from(&path);
        }

        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!(LogFormat::from("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from("text"), LogFormat::Text);
        assert_eq!(LogFormat::from("yaml"), LogFormat::Text);
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TransientConfig::parse("").unwrap();
        assert_eq!(config, TransientConfig::default());
        assert_eq!(config.namespace_prefix, "Transient");
        assert!(config.database.path.is_none());
        assert!(config.database.foreign_keys);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_toml_deserialization() {
        let toml = r#"
            namespace_prefix = "Fixtures"

            [database]
            path = "/tmp/fixtures.db"
            foreign_keys = false

            [logging]
            level = "debug"
            format = "json"
        "#;
        let config = TransientConfig::parse(toml).unwrap();
        assert_eq!(config.namespace_prefix, "Fixtures");
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/fixtures.db")));
        assert!(!config.database.foreign_keys);
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(TransientConfig::parse("namespace_prefix = [").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = TransientConfig {
            namespace_prefix: "Scratch".to_string(),
            database: DatabaseConfig {
                path: Some(dir.path().join("scratch.db")),
                ..DatabaseConfig::default()
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Text,
            },
        };
        config.save_to(&path).unwrap();

        assert_eq!(TransientConfig::load_from(&path).unwrap(), config);
    }
}
