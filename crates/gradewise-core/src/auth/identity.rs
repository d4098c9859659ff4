//! Identity provider trait and hosted HTTP implementation
//!
//! The hosted provider speaks a GoTrue-style API:
//! - `POST /signup`
//! - `POST /token?grant_type=password`
//! - `POST /logout`
//! - `GET /user`

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::Deserialize;

use super::types::{IdentitySession, IdentityUser};
use crate::api::error_message_from_body;
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// External identity provider
///
/// Rejections come back as [`Error::Identity`] carrying the HTTP status, so
/// callers can tell refused credentials (4xx) apart from outages.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account; may return a session without a token when
    /// email confirmation is pending
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> Result<IdentitySession>;

    /// Password-grant token exchange
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentitySession>;

    /// Invalidate the session behind `access_token`
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Look up the account behind `access_token`
    async fn get_user(&self, access_token: &str) -> Result<IdentityUser>;
}

/// HTTP client for the hosted identity API
pub struct HostedIdentityClient {
    base_url: String,
    client: Client,
}

impl HostedIdentityClient {
    /// Create a new identity client
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.auth_base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| Error::config(format!("Invalid auth URL '{}': {}", base_url, e)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = &config.auth_api_key {
            let value = header::HeaderValue::from_str(key)
                .map_err(|_| Error::config("Auth API key contains invalid characters"))?;
            headers.insert("apikey", value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self { base_url, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::identity(
                Some(status.as_u16()),
                error_message_from_body(status.as_u16(), &text),
            ));
        }
        serde_json::from_str(&text).map_err(|e| {
            Error::identity(Some(status.as_u16()), format!("Unexpected response: {}", e))
        })
    }
}

/// Signup answers with either a full session or the bare user
#[derive(Deserialize)]
#[serde(untagged)]
enum SignupResponse {
    Session(IdentitySession),
    User(IdentityUser),
}

#[async_trait]
impl IdentityProvider for HostedIdentityClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> Result<IdentitySession> {
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "data": metadata,
        });
        let response = self
            .client
            .post(self.url("signup"))
            .json(&payload)
            .send()
            .await?;

        match Self::read::<SignupResponse>(response).await? {
            SignupResponse::Session(session) => Ok(session),
            SignupResponse::User(user) => Ok(IdentitySession {
                access_token: None,
                refresh_token: None,
                expires_in: None,
                user,
            }),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentitySession> {
        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let response = self
            .client
            .post(self.url("token"))
            .query(&[("grant_type", "password")])
            .json(&payload)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("logout"))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::identity(
                Some(status.as_u16()),
                error_message_from_body(status.as_u16(), &text),
            ));
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<IdentityUser> {
        let response = self
            .client
            .get(self.url("user"))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::read(response).await
    }
}
