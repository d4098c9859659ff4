//! # gradewise-core
//!
//! Client-side core for Gradewise, used by the CLI.
//!
//! This crate provides:
//! - Durable session state (`session` and `storage` modules)
//! - Login, signup and logout against the identity provider (`auth` module)
//! - Typed REST resource clients (`api` module)
//! - Cached reads with write invalidation and polling (`query` module)
//! - Roster removal reconciliation (`roster` module)
//! - Derived grade summaries (`grades` module)
//! - Data models (`models` module)
//! - Unified error handling (`error` module)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod grades;
pub mod models;
pub mod query;
pub mod roster;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use api::{ApiClient, Resource, ResourceApi, ResourceKind};
pub use auth::{AuthError, AuthGateway, HostedIdentityClient, SignupError, SignupRequest};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use query::{Queries, QueryCache, QueryStatus};
pub use roster::{DeleteState, DeleteTracker, RosterReconciler};
pub use session::{Session, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

// Re-export commonly used types from models
pub use models::{
    Audience, Class, Enrollment, Envelope, Grade, Page, Recommendation, Role, Subject,
    UserProfile,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}
