use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::StaleguardError;
use crate::models::classification::DEFAULT_STALE_DAYS;
use crate::retry::RetryPolicy;

/// Regional deployment of the scanning platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tenant {
    Us,
    Eu,
    Au,
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tenant::Us => write!(f, "us"),
            Tenant::Eu => write!(f, "eu"),
            Tenant::Au => write!(f, "au"),
        }
    }
}

impl std::str::FromStr for Tenant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "us" => Ok(Tenant::Us),
            "eu" => Ok(Tenant::Eu),
            "au" => Ok(Tenant::Au),
            _ => Err(format!("unknown tenant: {s}")),
        }
    }
}

impl Tenant {
    /// Base URL of the REST API (`.../rest`).
    pub fn rest_url(&self) -> String {
        match self {
            Tenant::Us => "https://api.us.snyk.io/rest".to_string(),
            other => format!("https://api.{other}.snyk.io/rest"),
        }
    }

    /// Base URL of the v1 API used for tags and deactivation.
    pub fn v1_url(&self) -> String {
        match self {
            Tenant::Us => "https://api.snyk.io/v1".to_string(),
            other => format!("https://api.{other}.snyk.io/v1"),
        }
    }
}

/// Top-level configuration, stored at `~/.staleguard/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleguardConfig {
    /// Days without a push before a repository counts as stale.
    #[serde(default = "default_stale_days")]
    pub stale_days: i64,

    #[serde(default = "default_tenant")]
    pub tenant: Tenant,

    /// Pinned platform API version, sent as `?version=`.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Overrides the tenant's REST base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_url: Option<String>,

    /// Overrides the tenant's v1 base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v1_url: Option<String>,

    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Tag key written as `<key>=true|false`.
    #[serde(default = "default_status_tag_key")]
    pub status_tag_key: String,

    /// Organizations to process, by name, slug or id. Empty means all.
    #[serde(default)]
    pub orgs: Vec<String>,

    #[serde(default = "default_snyk_token_env")]
    pub snyk_token_env: String,

    #[serde(default = "default_github_token_env")]
    pub github_token_env: String,

    /// Total attempts per request, including the first.
    #[serde(default = "default_retry_tries")]
    pub retry_tries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_stale_days() -> i64 {
    DEFAULT_STALE_DAYS
}

fn default_tenant() -> Tenant {
    Tenant::Us
}

fn default_api_version() -> String {
    "2024-10-15".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_status_tag_key() -> String {
    "active_repo".to_string()
}

fn default_snyk_token_env() -> String {
    "SNYK_TOKEN".to_string()
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_retry_tries() -> u32 {
    4
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_retry_backoff() -> u32 {
    2
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for StaleguardConfig {
    fn default() -> Self {
        Self {
            stale_days: default_stale_days(),
            tenant: default_tenant(),
            api_version: default_api_version(),
            rest_url: None,
            v1_url: None,
            github_api_url: default_github_api_url(),
            status_tag_key: default_status_tag_key(),
            orgs: Vec::new(),
            snyk_token_env: default_snyk_token_env(),
            github_token_env: default_github_token_env(),
            retry_tries: default_retry_tries(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_backoff: default_retry_backoff(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl StaleguardConfig {
    /// Returns the staleguard home directory (`~/.staleguard/`).
    pub fn home_dir() -> Result<PathBuf, StaleguardError> {
        let base = dirs::home_dir().ok_or_else(|| StaleguardError::Config {
            message: "could not determine home directory".into(),
        })?;
        Ok(base.join(".staleguard"))
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Result<PathBuf, StaleguardError> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load config from the default location, or return defaults if not found.
    pub fn load() -> Result<Self, StaleguardError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, StaleguardError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| StaleguardError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), StaleguardError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| StaleguardError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create the home directory and write a default config if none exists.
    pub fn init() -> Result<PathBuf, StaleguardError> {
        let home = Self::home_dir()?;
        std::fs::create_dir_all(&home)?;

        let config_path = Self::config_path()?;
        if !config_path.exists() {
            Self::default().save_to(&config_path)?;
        }

        Ok(config_path)
    }

    pub fn validate(&self) -> Result<(), StaleguardError> {
        if self.stale_days < 0 {
            return Err(StaleguardError::Config {
                message: format!("stale_days must not be negative, got {}", self.stale_days),
            });
        }
        if self.status_tag_key.trim().is_empty() {
            return Err(StaleguardError::Config {
                message: "status_tag_key must not be empty".into(),
            });
        }
        if self.retry_tries == 0 {
            return Err(StaleguardError::Config {
                message: "retry_tries must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn rest_base(&self) -> String {
        self.rest_url
            .clone()
            .unwrap_or_else(|| self.tenant.rest_url())
    }

    pub fn v1_base(&self) -> String {
        self.v1_url.clone().unwrap_or_else(|| self.tenant.v1_url())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            tries: self.retry_tries,
            delay: Duration::from_millis(self.retry_delay_ms),
            backoff: self.retry_backoff,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
