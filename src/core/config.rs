use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const API_URL_ENV: &str = "SPENDLOG_API_URL";
pub const GOOGLE_CLIENT_ID_ENV: &str = "SPENDLOG_GOOGLE_CLIENT_ID";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_recent_limit() -> u32 {
    5
}

fn default_cache_ttl_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Enables Google sign-in when set.
    #[serde(default)]
    pub google_client_id: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            google_client_id: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api: ApiConfig::default(),
            page_size: default_page_size(),
            recent_limit: default_recent_limit(),
            cache_ttl_secs: default_cache_ttl_secs(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Reads the config at the default location, falling back to defaults
    /// when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}; using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "spendlog", "spendlog")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Directory holding the persisted session.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "spendlog", "spendlog")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies `SPENDLOG_*` overrides read through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Using API base URL from {}", API_URL_ENV);
            self.api.base_url = url.trim().to_string();
        }
        if let Some(id) = lookup(GOOGLE_CLIENT_ID_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.google_client_id = Some(id.trim().to_string());
        }
        self
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        Some(Duration::from_secs(self.cache_ttl_secs))
    }
}
