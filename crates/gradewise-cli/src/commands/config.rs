//! Config commands
//!
//! Shows the resolved client configuration and where each value came from.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Subcommand;
use gradewise_core::config::{
    ENV_API_URL, ENV_AUTH_KEY, ENV_AUTH_URL, ENV_SESSION_PATH, ENV_TIMEOUT_SECS,
};
use serde::Serialize;
use tabled::Tabled;

use super::Context;
use crate::output::{print_info, print_output};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key, e.g. api_url
        key: String,
    },
}

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

pub async fn execute(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => print_output(&config_rows(ctx), ctx.format),
        ConfigAction::Get { key } => get_config(ctx, &key),
    }
}

fn get_config(ctx: &Context, key: &str) -> Result<()> {
    let rows = config_rows(ctx);
    match rows.iter().find(|r| r.key.eq_ignore_ascii_case(key.trim())) {
        Some(row) => {
            print_info(&format!("{} = {}", row.key, row.value), false);
            Ok(())
        }
        None => {
            let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
            bail!("Config key not found: {}. Known keys: {}", key, keys.join(", "))
        }
    }
}

fn config_rows(ctx: &Context) -> Vec<ConfigRow> {
    let config = &ctx.config;

    vec![
        ConfigRow {
            key: "api_url".to_string(),
            value: config.api_base_url.clone(),
            source: source_of(ENV_API_URL),
        },
        ConfigRow {
            key: "auth_url".to_string(),
            value: config.auth_base_url.clone(),
            source: source_of(ENV_AUTH_URL),
        },
        ConfigRow {
            key: "auth_key".to_string(),
            value: if config.auth_api_key.is_some() { "(set)" } else { "-" }.to_string(),
            source: source_of(ENV_AUTH_KEY),
        },
        ConfigRow {
            key: "timeout_secs".to_string(),
            value: config.timeout_secs.to_string(),
            source: source_of(ENV_TIMEOUT_SECS),
        },
        ConfigRow {
            key: "session_path".to_string(),
            value: tilde_home(&config.session_path),
            source: source_of(ENV_SESSION_PATH),
        },
        ConfigRow {
            key: "logged_in_as".to_string(),
            value: ctx
                .session
                .user()
                .map(|u| format!("{} ({})", u.email, u.role))
                .unwrap_or_else(|| "-".to_string()),
            source: "session".to_string(),
        },
    ]
}

/// `env` when the variable (or its flag) is set, otherwise `default`
fn source_of(env_key: &str) -> String {
    match std::env::var(env_key) {
        Ok(v) if !v.trim().is_empty() => "env".to_string(),
        _ => "default".to_string(),
    }
}

/// Show paths under the home directory with a leading `~`
fn tilde_home(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return Path::new("~").join(rest).display().to_string();
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tilde_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let inside = home.join(".local/share/gradewise/session.json");
        assert_eq!(tilde_home(&inside), "~/.local/share/gradewise/session.json");
        assert_eq!(tilde_home(Path::new("/tmp/session.json")), "/tmp/session.json");
    }

    #[test]
    fn test_source_of_unset_variable() {
        assert_eq!(source_of("GRADEWISE_TEST_UNSET_KEY"), "default");
    }
}
