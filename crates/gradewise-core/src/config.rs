//! Client configuration
//!
//! Priority: explicit overrides > `GRADEWISE_*` environment variables > defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ENV_API_URL: &str = "GRADEWISE_API_URL";
pub const ENV_AUTH_URL: &str = "GRADEWISE_AUTH_URL";
pub const ENV_AUTH_KEY: &str = "GRADEWISE_AUTH_KEY";
pub const ENV_TIMEOUT_SECS: &str = "GRADEWISE_TIMEOUT_SECS";
pub const ENV_SESSION_PATH: &str = "GRADEWISE_SESSION_PATH";

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_AUTH_URL: &str = "http://localhost:9999/auth/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything needed to reach the backend and the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST backend (without the `/api` prefix)
    pub api_base_url: String,
    /// Base URL of the hosted identity API
    pub auth_base_url: String,
    /// Public API key sent to the identity provider
    pub auth_api_key: Option<String>,
    pub timeout_secs: u64,
    /// Where the session file lives
    pub session_path: PathBuf,
}

impl ClientConfig {
    /// Resolve configuration from the environment
    pub fn from_env() -> Result<Self> {
        let timeout_secs = match std::env::var(ENV_TIMEOUT_SECS) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::config(format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT_SECS, raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base_url: env_or(ENV_API_URL, DEFAULT_API_URL),
            auth_base_url: env_or(ENV_AUTH_URL, DEFAULT_AUTH_URL),
            auth_api_key: std::env::var(ENV_AUTH_KEY).ok().filter(|k| !k.is_empty()),
            timeout_secs,
            session_path: get_session_path()?,
        })
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_base_url = url.into();
        self
    }

    pub fn with_session_path(mut self, path: &str) -> Self {
        self.session_path = expand_path(path);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Check URLs before any client is built
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("API", &self.api_base_url), ("auth", &self.auth_base_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::config(format!(
                    "{} URL must start with http:// or https://, got '{}'",
                    name, url
                )));
            }
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|| default.to_string())
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Get the session file path
/// Priority: GRADEWISE_SESSION_PATH env var > default app data directory
pub fn get_session_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_SESSION_PATH) {
        if !path.trim().is_empty() {
            return Ok(expand_path(&path));
        }
    }

    let dirs = directories::ProjectDirs::from("com", "gradewise", "Gradewise")
        .ok_or_else(|| Error::config("Could not determine project directories"))?;

    Ok(dirs.data_dir().join("session.json"))
}
