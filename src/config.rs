//! Application configuration management.
//!
//! Configuration is stored at `~/.config/festsync/config.json`.
//! Environment variables override the file: `FESTSYNC_BACKEND_URL`,
//! `FESTSYNC_API_KEY`, `FESTSYNC_ADMIN_SECRET`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "festsync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Remote document backend endpoint. Absent means local-only mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub poll_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub backend: Option<BackendConfig>,
    pub admin_secret: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
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

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FESTSYNC_BACKEND_URL") {
            if !url.is_empty() {
                let backend = self.backend.get_or_insert_with(|| BackendConfig {
                    base_url: String::new(),
                    api_key: None,
                    poll_interval_secs: None,
                });
                backend.base_url = url;
            }
        }
        if let Ok(key) = std::env::var("FESTSYNC_API_KEY") {
            if let Some(ref mut backend) = self.backend {
                backend.api_key = Some(key);
            }
        }
        if let Ok(secret) = std::env::var("FESTSYNC_ADMIN_SECRET") {
            if !secret.is_empty() {
                self.admin_secret = Some(secret);
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the local durable cache.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_local_only() {
        let config = Config::default();
        assert!(config.backend.is_none());
        assert!(config.admin_secret.is_none());
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config {
            backend: Some(BackendConfig {
                base_url: "https://fest.example.com/api".to_string(),
                api_key: Some("k".to_string()),
                poll_interval_secs: Some(5),
            }),
            admin_secret: Some("s".to_string()),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        let backend = back.backend.unwrap();
        assert_eq!(backend.base_url, "https://fest.example.com/api");
        assert_eq!(backend.poll_interval_secs, Some(5));
        assert_eq!(back.admin_secret.as_deref(), Some("s"));
    }
}
