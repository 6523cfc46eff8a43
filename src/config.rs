//! Configuration loading and persistence.
//!
//! Reads and writes the tutor client configuration file (JSON in the
//! platform config directory), with environment variable overrides for
//! scripting and tests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::constants::{
    DEFAULT_LANGUAGE, DEFAULT_SERVER_URL, RECONNECT_BASE_DELAY, RECONNECT_MAX_ATTEMPTS,
    RECONNECT_MAX_DELAY,
};
use crate::session::ReconnectPolicy;

/// Configuration for the tutor client.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// Base URL of the tutor backend (`http(s)://` or `ws(s)://`).
    pub server_url: String,
    /// Default language tag for submissions.
    pub language: String,
    /// Delay before the first reconnection attempt, in milliseconds.
    pub reconnect_base_delay_ms: u64,
    /// Ceiling for the reconnect backoff, in milliseconds.
    pub reconnect_max_delay_ms: u64,
    /// Reconnection attempts before the link gives up.
    pub reconnect_max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            reconnect_base_delay_ms: RECONNECT_BASE_DELAY.as_millis() as u64,
            reconnect_max_delay_ms: RECONNECT_MAX_DELAY.as_millis() as u64,
            reconnect_max_attempts: RECONNECT_MAX_ATTEMPTS,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// `TUTOR_CONFIG_DIR` overrides the platform default (used by tests
    /// and scripted setups).
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(explicit) = std::env::var("TUTOR_CONFIG_DIR") {
            PathBuf::from(explicit)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("tutor")
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    ///
    /// A missing or unreadable file falls back to defaults rather than
    /// failing; the client should always be able to start.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file().unwrap_or_default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_dir()?.join("config.json");
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Applies `TUTOR_SERVER_URL` and `TUTOR_LANGUAGE` overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TUTOR_SERVER_URL") {
            self.server_url = url;
        }
        if let Ok(language) = std::env::var("TUTOR_LANGUAGE") {
            self.language = language;
        }
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_dir()?.join("config.json");
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Builds the reconnect policy from the configured knobs.
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect_base_delay_ms),
            Duration::from_millis(self.reconnect_max_delay_ms),
            self.reconnect_max_attempts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

    /// Env vars are process-global; tests that touch them take this lock
    /// so parallel test threads cannot contaminate each other.
    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn defaults_match_the_observed_backend() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:8000");
        assert_eq!(config.language, "python");
        assert_eq!(config.reconnect_base_delay_ms, 1000);
        assert_eq!(config.reconnect_max_delay_ms, 10_000);
        assert_eq!(config.reconnect_max_attempts, 5);
    }

    #[test]
    fn partial_config_file_fills_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "server_url": "https://tutor.example.com" }"#).unwrap();
        assert_eq!(config.server_url, "https://tutor.example.com");
        assert_eq!(config.language, "python");
    }

    #[test]
    fn save_and_load_round_trip() {
        let _env = env_guard();
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("TUTOR_CONFIG_DIR", dir.path());

        let mut config = Config::default();
        config.server_url = "https://tutor.example.com".to_string();
        config.save().unwrap();

        let loaded = Config::load().unwrap();
        assert_eq!(loaded.server_url, "https://tutor.example.com");

        std::env::remove_var("TUTOR_CONFIG_DIR");
    }

    #[test]
    fn env_override_wins_over_defaults() {
        let _env = env_guard();
        std::env::set_var("TUTOR_LANGUAGE", "javascript");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.language, "javascript");
        std::env::remove_var("TUTOR_LANGUAGE");
    }

    #[test]
    fn reconnect_policy_uses_configured_knobs() {
        let mut config = Config::default();
        config.reconnect_max_attempts = 2;
        config.reconnect_base_delay_ms = 50;
        let mut policy = config.reconnect_policy();
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(50)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(), None);
    }
}
