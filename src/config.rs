//! Application configuration management.
//!
//! Holds the backend base URL, the expiration-check interval, and the last
//! used username. Configuration is stored at
//! `~/.config/sessiongate/config.json`; the credential bundle file lives
//! under the platform cache directory.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessiongate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default backend base URL, overridable via config or SESSIONGATE_API_URL.
const DEFAULT_BASE_URL: &str = "https://api.example.org";

/// Default seconds between background expiration checks.
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 45;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub check_interval_secs: u64,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Base URL with the SESSIONGATE_API_URL environment override applied.
    pub fn effective_base_url(&self) -> String {
        std::env::var("SESSIONGATE_API_URL").unwrap_or_else(|_| self.base_url.clone())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted credential bundle.
    pub fn bundle_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.check_interval_secs, DEFAULT_CHECK_INTERVAL_SECS);
        assert!(config.last_username.is_none());
    }

    #[test]
    fn test_config_roundtrip_json() {
        let config = Config {
            base_url: "https://backend.test".to_string(),
            check_interval_secs: 30,
            last_username: Some("scout@example.org".to_string()),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.base_url, "https://backend.test");
        assert_eq!(parsed.check_interval_secs, 30);
    }
}
