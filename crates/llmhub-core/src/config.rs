//! Application configuration management.
//!
//! This module handles loading and saving the console configuration: the
//! backend URL, last used username, where the session token is kept and the
//! inactivity timeout settings.
//!
//! Configuration is stored at `~/.config/llmhub-admin/config.json`.
//! `LLMHUB_API_URL` overrides the configured backend URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_URL;
use crate::session::policy::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SESSION_TIMEOUT_MINUTES, DEFAULT_WARNING_LEAD_MINUTES,
};
use crate::session::{FileStore, KeyValueStore, KeyringStore, PolicyError, TimeoutPolicy};

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "llmhub-admin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the backend URL
pub const API_URL_ENV: &str = "LLMHUB_API_URL";

/// Where the session token and activity timestamp are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub timeout_minutes: i64,
    pub warning_minutes: i64,
    pub poll_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
            warning_minutes: DEFAULT_WARNING_LEAD_MINUTES,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_username: Option<String>,
    pub store_backend: StoreBackend,
    pub session: SessionSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the session store file and logs.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Backend URL: environment, then config, then the default.
    pub fn api_url(&self) -> String {
        Self::resolve_api_url(std::env::var(API_URL_ENV).ok(), self.api_url.as_deref())
    }

    fn resolve_api_url(env: Option<String>, configured: Option<&str>) -> String {
        env.filter(|v| !v.trim().is_empty())
            .or_else(|| configured.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Validated timeout policy from the session settings.
    pub fn policy(&self) -> Result<TimeoutPolicy> {
        let s = &self.session;
        let timeout = Duration::try_minutes(s.timeout_minutes).ok_or(PolicyError::OutOfRange {
            field: "session.timeout_minutes",
        })?;
        let lead = Duration::try_minutes(s.warning_minutes).ok_or(PolicyError::OutOfRange {
            field: "session.warning_minutes",
        })?;
        let policy = TimeoutPolicy::new(
            timeout,
            lead,
            std::time::Duration::from_secs(s.poll_interval_secs),
        )?;
        Ok(policy)
    }

    /// The configured persistence backend for the session token.
    pub fn open_store(&self, data_dir: &Path) -> Arc<dyn KeyValueStore> {
        match self.store_backend {
            StoreBackend::File => Arc::new(FileStore::in_dir(data_dir)),
            StoreBackend::Keyring => Arc::new(KeyringStore::default()),
        }
    }
}
