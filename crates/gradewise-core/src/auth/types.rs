//! Auth request, result and error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Role, UserProfile};

/// Minimum password length accepted by the identity provider
pub const MIN_PASSWORD_LEN: usize = 6;

/// Login failures
///
/// A rejected password and a missing backend profile are deliberately
/// separate: the second means the account exists but was never provisioned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Invalid login: {0}")]
    Validation(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("No profile found for account {auth_user_id}; ask your administrator to finish setting it up")]
    ProfileNotFound { auth_user_id: String },

    #[error("Could not load your profile: {0}")]
    ProfileLookup(String),

    #[error("Identity provider unavailable: {0}")]
    Identity(String),

    #[error("Identity provider did not return an access token")]
    MissingToken,
}

/// Signup failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignupError {
    #[error("Invalid signup: {0}")]
    Validation(String),

    #[error("Account creation failed: {0}")]
    Identity(String),

    /// The identity account exists but its backend profile does not
    #[error("Account created but profile setup failed: {message}")]
    ProfileCreation {
        auth_user_id: String,
        message: String,
    },
}

/// Signup form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    /// Repeated password, checked locally when present
    pub confirm_password: Option<String>,
    pub full_name: String,
    pub role: Role,
}

impl SignupRequest {
    /// Local checks run before any network call
    pub fn validate(&self) -> Result<(), SignupError> {
        validate_email(&self.email).map_err(SignupError::Validation)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SignupError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if let Some(confirm) = &self.confirm_password {
            if confirm != &self.password {
                return Err(SignupError::Validation("Passwords do not match".to_string()));
            }
        }
        if self.full_name.trim().is_empty() {
            return Err(SignupError::Validation("Full name is required".to_string()));
        }
        Ok(())
    }
}

pub(crate) fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid email address", email))
    }
}

/// Result of a successful login or signup, ready for the session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub auth_user_id: String,
    pub user: UserProfile,
}

/// Account as seen by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Identity provider session; `access_token` is absent when signup still
/// awaits email confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySession {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: IdentityUser,
}
