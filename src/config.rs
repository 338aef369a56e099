//! Configuration management for AlchemyWatch
//!
//! Handles config file loading and the fallback chain for each
//! setting. Config is stored at ~/.config/alchemywatch/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::fetcher::DEFAULT_API_URL;
use crate::debounce::DEFAULT_DELAY;
use crate::player::PlayerType;
use crate::query::RetryPolicy;

/// Environment variable overriding the backend URL
pub const API_URL_ENV: &str = "ALCHEMY_API_URL";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the fetcher backend
    pub api_url: Option<String>,
    /// Quiet period before a search fires, in milliseconds
    pub debounce_ms: Option<u64>,
    /// Attempts per query before giving up
    pub max_attempts: Option<u32>,
    /// First retry delay in milliseconds (doubles per attempt)
    pub retry_base_delay_ms: Option<u64>,
    /// Local player (mpv, vlc)
    pub player: Option<String>,
    /// Start the player as soon as servers resolve
    pub autoplay: Option<bool>,
}

impl Config {
    /// Get config file path (~/.config/alchemywatch/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("alchemywatch").join("config.toml"))
    }

    /// Load config from the default location, or defaults if missing
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| Self::load_from(&p).ok())
            .unwrap_or_default()
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Backend URL with fallback chain:
    /// 1. Environment variable ALCHEMY_API_URL
    /// 2. Config file
    /// 3. Built-in default
    pub fn api_url(&self) -> String {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                return url;
            }
        }
        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DELAY)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(max) = self.max_attempts {
            policy.max_attempts = max.max(1);
        }
        if let Some(ms) = self.retry_base_delay_ms {
            policy.base_delay = Duration::from_millis(ms);
        }
        policy
    }

    /// Configured player, falling back to mpv for unknown names
    pub fn player_type(&self) -> PlayerType {
        self.player
            .as_deref()
            .and_then(PlayerType::from_name)
            .unwrap_or_default()
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.api_url.is_none());
        assert_eq!(config.debounce_delay(), Duration::from_millis(500));
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.player_type(), PlayerType::Mpv);
        assert!(config.autoplay());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config {
            debounce_ms: Some(250),
            max_attempts: Some(0),
            retry_base_delay_ms: Some(10),
            player: Some("vlc".into()),
            autoplay: Some(false),
            ..Config::default()
        };
        assert_eq!(config.debounce_delay(), Duration::from_millis(250));

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(10));

        assert_eq!(config.player_type(), PlayerType::Vlc);
        assert!(!config.autoplay());
    }

    #[test]
    fn test_unknown_player_falls_back() {
        let config = Config {
            player: Some("winamp".into()),
            ..Config::default()
        };
        assert_eq!(config.player_type(), PlayerType::Mpv);
    }

    #[test]
    fn test_config_toml_roundtrip_on_disk() {
        let dir = std::env::temp_dir().join(format!("alchemywatch-test-{}", std::process::id()));
        let path = dir.join("config.toml");
        let config = Config {
            api_url: Some("http://example.test/api/trpc".into()),
            max_attempts: Some(3),
            ..Config::default()
        };

        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let path = std::env::temp_dir().join("alchemywatch-does-not-exist.toml");
        assert!(Config::load_from(&path).is_err());
    }
}
