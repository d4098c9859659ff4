//! REST backend client
//!
//! Every backend response is wrapped in `{success, data, message?, timestamp}`.
//! [`ApiClient`] unwraps it uniformly: `success: false`, a non-2xx status, an
//! unreadable body and a transport error are all failures, and the backend's
//! `message` is surfaced whenever it sent one.

pub mod resources;
pub mod users;

use reqwest::{header, Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::Envelope;

pub use resources::{
    Classes, Enrollments, Grades, Recommendations, Resource, ResourceApi, ResourceClient,
    ResourceKind, Subjects, Users,
};

/// Path prefix shared by every backend endpoint
const API_PREFIX: &str = "api";

/// HTTP client for the REST backend
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    client: Client,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new client from the configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(config.api_base_url.trim_end_matches('/'))
            .map_err(|e| Error::config(format!("Invalid API URL '{}': {}", config.api_base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "API URL cannot be used as a base: {}",
                config.api_base_url
            )));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            base_url,
            client,
            token: None,
        })
    }

    /// Attach the session bearer token to every request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Typed client for one resource
    pub fn resource<R: Resource>(&self) -> ResourceClient<'_, R> {
        ResourceClient::new(self)
    }

    /// Build `{base}/api/{segments...}` with every segment percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::config("API URL cannot be used as a base"))?;
            path.pop_if_empty();
            path.push(API_PREFIX);
            path.extend(segments);
        }
        Ok(url)
    }

    /// Start a request, preferring `token` over the client's own token
    pub(crate) fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        log::debug!("[api] {} {}", method, url);
        let builder = self.client.request(method, url);
        match token.or(self.token.as_deref()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and unwrap the envelope
    pub(crate) async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        let result = unwrap_envelope(status, &body);
        if let Err(e) = &result {
            log::warn!("[api] Request failed: {}", e);
        }
        result
    }

    pub(crate) async fn get_json<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        url: Url,
        query: Option<&Q>,
        token: Option<&str>,
    ) -> Result<T> {
        let mut builder = self.request(Method::GET, url, token);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        self.execute(builder).await
    }

    pub(crate) async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        token: Option<&str>,
    ) -> Result<T> {
        let builder = self.request(method, url, token).json(body);
        self.execute(builder).await
    }
}

/// Unwrap a backend response body into its `data` payload
///
/// Missing `data` is read as JSON `null`, so unit payloads (deletes) succeed
/// while typed payloads fail with a shape error.
pub fn unwrap_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    let ok_status = (200..300).contains(&status);

    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) if envelope.success && ok_status => {
            let data = envelope.data.unwrap_or(serde_json::Value::Null);
            serde_json::from_value(data).map_err(|e| {
                Error::api(Some(status), format!("Unexpected response shape: {}", e))
            })
        }
        Ok(envelope) => Err(Error::api(
            Some(status),
            envelope
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_message(status)),
        )),
        Err(_) if ok_status && body.trim().is_empty() => serde_json::from_value(serde_json::Value::Null)
            .map_err(|_| Error::api(Some(status), "Empty response body")),
        Err(e) if ok_status => Err(Error::api(
            Some(status),
            format!("Malformed response: {}", e),
        )),
        Err(_) => Err(Error::api(Some(status), error_message_from_body(status, body))),
    }
}

/// Best-effort message from a non-envelope error body
pub(crate) fn error_message_from_body(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error_description", "error", "msg"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                if !msg.trim().is_empty() {
                    return msg.to_string();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('<') {
        default_message(status)
    } else {
        trimmed.chars().take(200).collect()
    }
}

pub(crate) fn default_message(status: u16) -> String {
    match status {
        400 => "Bad request".to_string(),
        401 => "Session expired, please log in again".to_string(),
        403 => "You do not have permission to do that".to_string(),
        404 => "Not found".to_string(),
        409 => "Conflict with existing data".to_string(),
        500..=599 => format!("Server error (HTTP {})", status),
        _ => format!("Request failed (HTTP {})", status),
    }
}
