//! Configuration module

use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default mode for directories the extractor prepares itself
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Extraction configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// How block and character device entries are materialized
    #[serde(default)]
    pub device_nodes: DeviceNodePolicy,
    /// Mode for the destination (or its parent) when it has to be created
    #[serde(default = "default_dir_mode", deserialize_with = "deserialize_mode")]
    pub dir_mode: u32,
}

/// Handling of block and character device entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceNodePolicy {
    /// Write the entry's content as a regular file
    #[default]
    AsRegularFile,
    /// Create a real device node (usually requires privileges)
    Create,
}

/// Mode as written in a config file: a number or an octal string such as "0755"
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ModeConfig {
    Numeric(u32),
    Octal(String),
}

fn default_dir_mode() -> u32 {
    DEFAULT_DIR_MODE
}

fn deserialize_mode<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match ModeConfig::deserialize(deserializer)? {
        ModeConfig::Numeric(mode) => Ok(mode),
        ModeConfig::Octal(text) => {
            parse_mode(&text).map_err(|e| D::Error::custom(format!("Failed to parse mode: {}", e)))
        }
    }
}

/// Parse an octal mode string like "0755" or "0o644"
pub fn parse_mode(mode_str: &str) -> Result<u32> {
    let trimmed = mode_str.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);

    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| Error::Config(format!("Invalid octal mode: {}", mode_str)))?;
    if mode > 0o7777 {
        return Err(Error::Config(format!("Mode out of range: {}", mode_str)));
    }

    Ok(mode)
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            device_nodes: DeviceNodePolicy::default(),
            dir_mode: DEFAULT_DIR_MODE,
        }
    }
}

impl ExtractConfig {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir().ok_or_else(|| {
            Error::Config("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join("tgz").join("config.toml"))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Serialize configuration to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;

        Self::from_toml_str(&contents)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Load the user configuration, falling back to defaults when it is
    /// absent or unreadable
    pub fn load_or_default() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(e) => {
                tracing::debug!("No configuration directory: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file is absent or unreadable
    pub fn load_or_default_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring configuration: {}", e);
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExtractConfig::default();
        assert_eq!(config.device_nodes, DeviceNodePolicy::AsRegularFile);
        assert_eq!(config.dir_mode, 0o755);
    }

    #[test]
    fn test_config_serialization() {
        let config = ExtractConfig {
            device_nodes: DeviceNodePolicy::Create,
            dir_mode: 0o700,
        };
        let toml_str = config.to_toml_string().unwrap();
        let deserialized = ExtractConfig::from_toml_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("755").unwrap(), 0o755);
        assert_eq!(parse_mode("0755").unwrap(), 0o755);
        assert_eq!(parse_mode("0o644").unwrap(), 0o644);
        assert!(parse_mode("999").is_err());
        assert!(parse_mode("17777").is_err());
    }

    #[test]
    fn test_mode_deserialization() {
        let config = ExtractConfig::from_toml_str(
            r#"
            device_nodes = "create"
            dir_mode = "0700"
        "#,
        )
        .unwrap();
        assert_eq!(config.device_nodes, DeviceNodePolicy::Create);
        assert_eq!(config.dir_mode, 0o700);

        let config = ExtractConfig::from_toml_str("dir_mode = 448").unwrap();
        assert_eq!(config.dir_mode, 0o700);
        assert_eq!(config.device_nodes, DeviceNodePolicy::AsRegularFile);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ExtractConfig::from_toml_str("").unwrap();
        assert_eq!(config, ExtractConfig::default());
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let err = ExtractConfig::from_toml_str(r#"device_nodes = "emulate""#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
