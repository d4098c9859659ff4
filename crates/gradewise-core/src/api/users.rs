//! User profile endpoints beyond plain CRUD

use async_trait::async_trait;
use reqwest::Method;

use super::{ApiClient, Resource, Users};
use crate::auth::ProfileDirectory;
use crate::error::{Error, Result};
use crate::models::{CreateUserProfile, UserProfile};

impl ApiClient {
    /// `GET /api/users/auth/{authUserId}`; a 404 means no profile exists
    pub async fn find_user_by_auth_id(
        &self,
        auth_user_id: &str,
        token: Option<&str>,
    ) -> Result<Option<UserProfile>> {
        let url = self.endpoint(&[Users::KIND.path(), "auth", auth_user_id])?;
        match self.get_json::<UserProfile, ()>(url, None, token).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The profile behind the client's own token
    pub async fn current_user(&self, auth_user_id: &str) -> Result<UserProfile> {
        self.find_user_by_auth_id(auth_user_id, None)
            .await?
            .ok_or_else(|| Error::not_found(format!("profile for {}", auth_user_id)))
    }
}

#[async_trait]
impl ProfileDirectory for ApiClient {
    async fn find_by_auth_user_id(
        &self,
        access_token: &str,
        auth_user_id: &str,
    ) -> Result<Option<UserProfile>> {
        self.find_user_by_auth_id(auth_user_id, Some(access_token)).await
    }

    async fn create_profile(
        &self,
        access_token: &str,
        profile: &CreateUserProfile,
    ) -> Result<UserProfile> {
        let url = self.endpoint(&[Users::KIND.path()])?;
        let user: UserProfile = self
            .send_json(Method::POST, url, profile, Some(access_token))
            .await?;
        log::info!("[api] Created profile {} for {}", user.id, user.email);
        Ok(user)
    }
}
