//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the server URL, the last email used to log in and the id of the last
//! user, which selects the per-user cache directory.
//!
//! Configuration is stored at `~/.config/liftlog/config.json`. The
//! `LIFTLOG_SERVER_URL` and `LIFTLOG_EMAIL` environment variables take
//! precedence over stored values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "liftlog";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Server used when nothing is configured
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8090";

pub const ENV_SERVER_URL: &str = "LIFTLOG_SERVER_URL";
pub const ENV_EMAIL: &str = "LIFTLOG_EMAIL";
pub const ENV_PASSWORD: &str = "LIFTLOG_PASSWORD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    pub server_url: Option<String>,
    pub last_email: Option<String>,
    pub user_id: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Server to talk to: environment, then config, then the default
    pub fn server_url(&self) -> String {
        Self::resolve(
            std::env::var(ENV_SERVER_URL).ok(),
            self.server_url.as_deref(),
            DEFAULT_SERVER_URL,
        )
    }

    /// Email to prefill the login form with
    pub fn login_email(&self) -> Option<String> {
        std::env::var(ENV_EMAIL)
            .ok()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| self.last_email.clone())
    }

    /// Password from the environment, for unattended logins
    pub fn env_password() -> Option<String> {
        std::env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty())
    }

    fn resolve(env: Option<String>, stored: Option<&str>, default: &str) -> String {
        env.filter(|v| !v.trim().is_empty())
            .or_else(|| stored.filter(|v| !v.trim().is_empty()).map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    /// Root of the cache directory, shared by all users
    pub fn base_cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Per-user cache directory, or the shared root before anyone logged in
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let mut path = Self::base_cache_dir()?;
        if let Some(ref user) = self.user_id {
            path = path.join(user);
        }
        Ok(path)
    }
}
