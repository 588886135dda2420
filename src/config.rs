use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::api::DEFAULT_BASE_URL;
use crate::mock::DEFAULT_LATENCY_MS;

pub const APP_DIR: &str = "docassist";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_latency_ms: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Flag value first, then the stored value, then the built-in default
    pub fn resolve_base_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn resolve_mock(&self, flag: bool) -> bool {
        flag || self.mock.unwrap_or(false)
    }

    pub fn mock_latency(&self) -> Duration {
        Duration::from_millis(self.mock_latency_ms.unwrap_or(DEFAULT_LATENCY_MS))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join(APP_DIR))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.resolve_base_url(None), DEFAULT_BASE_URL);
        assert!(!config.resolve_mock(false));
        assert_eq!(config.mock_latency(), Duration::from_millis(DEFAULT_LATENCY_MS));
    }

    #[test]
    fn test_save_creates_dir_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://assistant.internal:8000".into()),
            mock: Some(true),
            mock_latency_ms: None,
        };
        config.save_to(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("mock_latency_ms"));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_flags_override_stored_values() {
        let config = Config {
            base_url: Some("http://stored:1".into()),
            mock: Some(false),
            mock_latency_ms: Some(0),
        };
        assert_eq!(config.resolve_base_url(Some("http://flag:2")), "http://flag:2");
        assert_eq!(config.resolve_base_url(None), "http://stored:1");
        assert!(config.resolve_mock(true));
        assert_eq!(config.mock_latency(), Duration::ZERO);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
