//! Backend profile lookup used during login and signup

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CreateUserProfile, UserProfile};

/// Where backend profiles live, keyed by identity provider user id
///
/// Implemented by [`crate::api::ApiClient`]; tests substitute an in-memory map.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// `Ok(None)` when the backend has no profile for the account
    async fn find_by_auth_user_id(
        &self,
        access_token: &str,
        auth_user_id: &str,
    ) -> Result<Option<UserProfile>>;

    async fn create_profile(
        &self,
        access_token: &str,
        profile: &CreateUserProfile,
    ) -> Result<UserProfile>;
}
