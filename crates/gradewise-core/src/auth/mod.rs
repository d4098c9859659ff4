//! Auth module
//!
//! Login, signup and logout using trait-based dependency injection for testability.
//!
//! ## Structure
//! - `types.rs` - Request/response data types and errors
//! - `identity.rs` - IdentityProvider trait and hosted HTTP implementation
//! - `directory.rs` - ProfileDirectory trait (backend profiles)
//! - `service.rs` - AuthGateway business logic

pub mod directory;
pub mod identity;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use directory::ProfileDirectory;
pub use identity::{HostedIdentityClient, IdentityProvider};
pub use service::AuthGateway;
pub use types::{
    AuthError, AuthSession, IdentitySession, IdentityUser, SignupError, SignupRequest,
    MIN_PASSWORD_LEN,
};
