//! Compile configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`CompileConfig`]
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Compile configuration
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Compose file format version
    pub manifest_version: String,
    /// Data store service settings
    pub data_store: DataStoreConfig,
}

impl CompileConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid TOML for this config
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            manifest_version: "3".to_string(),
            data_store: DataStoreConfig::default(),
        }
    }
}

/// Data store service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataStoreConfig {
    /// Container image
    pub image: String,
    /// First host port to publish data stores on
    pub host_port_base: u16,
    /// Health check settings
    pub healthcheck: HealthcheckConfig,
}

impl Default for DataStoreConfig {
    fn default() -> Self {
        Self {
            image: "postgres:latest".to_string(),
            host_port_base: 5432,
            healthcheck: HealthcheckConfig::default(),
        }
    }
}

/// Health check settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthcheckConfig {
    /// Seconds between checks
    pub interval_secs: u64,
    /// Seconds before a check times out
    pub timeout_secs: u64,
    /// Consecutive failures before unhealthy
    pub retries: u32,
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 5,
            retries: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CompileConfig::default();
        assert_eq!(config.manifest_version, "3");
        assert_eq!(config.data_store.image, "postgres:latest");
        assert_eq!(config.data_store.host_port_base, 5432);
        assert_eq!(config.data_store.healthcheck.retries, 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CompileConfig::from_toml_str(
            r#"
            [data_store]
            image = "postgres:16"

            [data_store.healthcheck]
            retries = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.data_store.image, "postgres:16");
        assert_eq!(config.data_store.healthcheck.retries, 10);
        assert_eq!(config.data_store.healthcheck.interval_secs, 5);
        assert_eq!(config.manifest_version, "3");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CompileConfig::from_toml_str("data_store = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "manifest_version = \"3.8\"").unwrap();
        let config = CompileConfig::load(file.path()).unwrap();
        assert_eq!(config.manifest_version, "3.8");
    }

    #[test]
    fn test_load_missing_file() {
        let err = CompileConfig::load(Path::new("/nonexistent/lif.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
