//! REST client for the story service.
//!
//! # Architecture
//!
//! The crate is organized around the [`StoryApi`] trait, the remote boundary the
//! rest of the workspace depends on:
//!
//! - [`StoryApi`] - login, register, list stories (paged), create story
//! - [`HttpStoryApi`] - reqwest implementation against the JSON/multipart API
//! - [`transport`] - single-attempt send with a structural success/failure outcome
//!
//! # Wire Envelope
//!
//! Every endpoint answers with `{ "error": bool, "message": string, ... }`. The
//! envelope is decoded once at this boundary into a typed result:
//!
//! | Response | Result |
//! |----------|--------|
//! | 2xx, `error: false`, body matches schema | `Ok(..)` |
//! | 2xx, `error: true` | [`ApiError::ServerRejected`] |
//! | 401 | [`ApiError::Unauthorized`] |
//! | other non-2xx | [`ApiError::ServerRejected`] |
//! | 2xx, body does not match schema | [`ApiError::InvalidResponse`] |
//! | transport failure | [`ApiError::Network`] |
//!
//! # Retries
//!
//! None. Every request is sent exactly once and every failure is returned to the
//! caller.

mod envelope;
mod http;
pub mod transport;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

pub use envelope::LoginResult;
pub use http::HttpStoryApi;
use storyfeed_types::{AuthToken, Email, LocationFilter, Password, StoryItem};

/// Public story service endpoint.
pub const DEFAULT_BASE_URL: &str = "https://story-api.dicoding.dev/v1";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),
}

/// One page request against the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: u32,
    /// Items per page; `None` leaves the server default.
    pub size: Option<u32>,
    pub location: LocationFilter,
}

impl PageQuery {
    #[must_use]
    pub const fn first(size: Option<u32>, location: LocationFilter) -> Self {
        Self {
            page: 1,
            size,
            location,
        }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            page: self.page + 1,
            ..self
        }
    }
}

/// Encoded image plus description for the create endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryUpload {
    pub description: String,
    pub file_name: String,
    pub image: Vec<u8>,
}

/// The remote story service.
pub trait StoryApi: Send + Sync {
    fn login(
        &self,
        email: &Email,
        password: &Password,
    ) -> impl Future<Output = Result<LoginResult, ApiError>> + Send;

    fn register(
        &self,
        name: &str,
        email: &Email,
        password: &Password,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn list_stories(
        &self,
        query: PageQuery,
        token: &AuthToken,
    ) -> impl Future<Output = Result<Vec<StoryItem>, ApiError>> + Send;

    fn create_story(
        &self,
        token: &AuthToken,
        upload: StoryUpload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl<T: StoryApi> StoryApi for &T {
    fn login(
        &self,
        email: &Email,
        password: &Password,
    ) -> impl Future<Output = Result<LoginResult, ApiError>> + Send {
        (**self).login(email, password)
    }

    fn register(
        &self,
        name: &str,
        email: &Email,
        password: &Password,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).register(name, email, password)
    }

    fn list_stories(
        &self,
        query: PageQuery,
        token: &AuthToken,
    ) -> impl Future<Output = Result<Vec<StoryItem>, ApiError>> + Send {
        (**self).list_stories(query, token)
    }

    fn create_story(
        &self,
        token: &AuthToken,
        upload: StoryUpload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).create_story(token, upload)
    }
}

/// Connection settings for [`HttpStoryApi`].
///
/// ```rust
/// use std::time::Duration;
/// use storyfeed_api::ApiConfig;
///
/// let config = ApiConfig::new("https://stories.example.com/v1")
///     .with_timeout(Duration::from_secs(10));
/// assert_eq!(config.base_url(), "https://stories.example.com/v1");
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
    connect_timeout: Duration,
    timeout: Duration,
    https_only: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiConfig {
    /// Trailing slashes on `base_url` are ignored.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            https_only: true,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Permit plain `http://` endpoints (local servers, tests).
    #[must_use]
    pub fn allow_insecure(mut self) -> Self {
        self.https_only = false;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    #[must_use]
    pub const fn https_only(&self) -> bool {
        self.https_only
    }
}

/// Read at most [`MAX_ERROR_BODY_BYTES`] of a response body as lossy UTF-8.
pub async fn read_capped_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
