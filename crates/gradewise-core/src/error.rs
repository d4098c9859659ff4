//! Unified error handling for gradewise-core

use thiserror::Error;

use crate::auth::{AuthError, SignupError};

/// Core error type for gradewise-core
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (connection, timeout, body decoding)
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with `success: false` or a non-2xx status
    #[error("API error{}: {message}", status_suffix(.status))]
    Api { status: Option<u16>, message: String },

    /// Identity provider answered with an error
    #[error("Identity provider error{}: {message}", status_suffix(.status))]
    Identity { status: Option<u16>, message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Signup(#[from] SignupError),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A bounded wait ran out before the expected state was observed
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// Result type alias for gradewise-core
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a backend error
    pub fn api(status: Option<u16>, msg: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: msg.into(),
        }
    }

    /// Create an identity provider error
    pub fn identity(status: Option<u16>, msg: impl Into<String>) -> Self {
        Error::Identity {
            status,
            message: msg.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Error::Forbidden(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    /// Copy of this error for every caller sharing one failed request
    ///
    /// Variants wrapping non-clonable sources keep their message only.
    pub fn to_shared(&self) -> Error {
        match self {
            Error::Http(e) => Error::Internal(format!("HTTP request error: {}", e)),
            Error::Api { status, message } => Error::api(*status, message.clone()),
            Error::Identity { status, message } => Error::identity(*status, message.clone()),
            Error::Auth(e) => Error::Auth(e.clone()),
            Error::Signup(e) => Error::Signup(e.clone()),
            Error::NotAuthenticated => Error::NotAuthenticated,
            Error::Forbidden(m) => Error::Forbidden(m.clone()),
            Error::Storage(m) => Error::Storage(m.clone()),
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
            Error::Json(e) => Error::Internal(format!("JSON error: {}", e)),
            Error::Config(m) => Error::Config(m.clone()),
            Error::Validation(m) => Error::Validation(m.clone()),
            Error::NotFound(m) => Error::NotFound(m.clone()),
            Error::Timeout(m) => Error::Timeout(m.clone()),
            Error::Internal(m) => Error::Internal(m.clone()),
        }
    }

    /// Whether the error was caught locally before any network call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::Auth(AuthError::Validation(_))
                | Error::Signup(SignupError::Validation(_))
        )
    }

    /// Whether the backend reported the entity as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Api { status: Some(404), .. })
    }
}

// Convert to String for display in the front end
impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::validation("Year must be between 2000 and 2100");
        assert_eq!(
            err.to_string(),
            "Validation error: Year must be between 2000 and 2100"
        );
    }

    #[test]
    fn test_api_error_display_with_status() {
        let err = Error::api(Some(409), "Student already enrolled");
        assert_eq!(err.to_string(), "API error (409): Student already enrolled");
    }

    #[test]
    fn test_api_error_display_without_status() {
        let err = Error::api(None, "Request failed");
        assert_eq!(err.to_string(), "API error: Request failed");
    }

    #[test]
    fn test_error_conversion_to_string() {
        let err = Error::validation("Invalid input");
        let s: String = err.into();
        assert!(s.contains("Validation error"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::not_found("user").is_not_found());
        assert!(Error::api(Some(404), "missing").is_not_found());
        assert!(!Error::api(Some(500), "boom").is_not_found());
    }

    #[test]
    fn test_auth_error_is_transparent() {
        let err: Error = AuthError::InvalidCredentials("bad password".into()).into();
        assert_eq!(err.to_string(), "Invalid credentials: bad password");
    }

    #[test]
    fn test_to_shared_keeps_kind_and_message() {
        let err = Error::api(Some(503), "maintenance");
        match err.to_shared() {
            Error::Api { status, message } => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(Error::validation("x").to_shared().is_validation());
        assert!(matches!(Error::timeout("slow").to_shared(), Error::Timeout(_)));
    }
}
