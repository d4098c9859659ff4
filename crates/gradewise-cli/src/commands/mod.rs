//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod auth;
pub mod classes;
pub mod config;
pub mod grades;
pub mod helpers;
pub mod profile;
pub mod recommendations;
pub mod roster;
pub mod subjects;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use gradewise_core::{
    ApiClient, AuthGateway, ClientConfig, FileStore, HostedIdentityClient, Queries, Role,
    SessionStore, UserProfile,
};

use crate::output::OutputFormat;

/// Shared context for all commands
pub struct Context {
    pub config: ClientConfig,
    pub session: SessionStore<FileStore>,
    pub queries: Arc<Queries<ApiClient>>,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Context {
    /// Restore the stored session and build the clients around it
    pub fn new(config: ClientConfig, format: OutputFormat, quiet: bool) -> Result<Self> {
        let mut session = SessionStore::new(FileStore::new(&config.session_path));
        if session.restore_session() {
            log::debug!("[cli] Using stored session from {}", config.session_path.display());
        }

        let api = ApiClient::new(&config)?.with_token(session.token().map(str::to_string));
        Ok(Self {
            config,
            session,
            queries: Arc::new(Queries::new(api)),
            format,
            quiet,
        })
    }

    /// Gateway for login, signup, logout and profile refresh
    pub fn gateway(&self) -> Result<AuthGateway<HostedIdentityClient, ApiClient>> {
        let identity = HostedIdentityClient::new(&self.config)?;
        let profiles = ApiClient::new(&self.config)?;
        Ok(AuthGateway::new(identity, profiles))
    }

    /// Rebuild the API client after the session token changed
    pub fn reload_token(&mut self) -> Result<()> {
        let api = ApiClient::new(&self.config)?.with_token(self.session.token().map(str::to_string));
        self.queries = Arc::new(Queries::new(api));
        Ok(())
    }

    pub fn require_user(&self) -> Result<&UserProfile> {
        self.session
            .require_user()
            .context("Run 'gradewise auth login' first")
    }

    /// Writes to subjects, classes, rosters and grades are teacher-only
    pub fn require_teacher(&self) -> Result<&UserProfile> {
        self.require_user()?;
        Ok(self.session.require_role(Role::Teacher)?)
    }
}
