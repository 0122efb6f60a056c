//! Sequential page loop over the story list endpoint.
//!
//! Pages are requested one at a time starting at 1. Each non-empty page is
//! appended in response order and the page number advances by one; the first
//! empty page ends the feed. Any failure discards everything accumulated so far.
//!
//! Two guards bound the loop:
//! - `max_pages`: a server that never returns an empty page is reported as
//!   [`FetchError::PageLimitExceeded`] instead of looping forever.
//! - a [`CancellationToken`], checked before each request and raced against the
//!   request in flight.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use storyfeed_api::{ApiError, PageQuery, StoryApi};
use storyfeed_types::{AuthToken, LocationFilter, StoryItem};

pub const DEFAULT_MAX_PAGES: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),
    #[error("feed did not end within {max_pages} pages")]
    PageLimitExceeded { max_pages: u32 },
    #[error("feed fetch cancelled")]
    Cancelled,
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => Self::Network(msg),
            ApiError::Unauthorized(message) => Self::ServerRejected {
                status: 401,
                message,
            },
            ApiError::ServerRejected { status, message } => Self::ServerRejected { status, message },
            ApiError::InvalidResponse(msg) => Self::InvalidResponse(msg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOptions {
    /// Items per page; `None` leaves the server default.
    pub page_size: Option<u32>,
    /// Non-empty pages allowed before giving up. Values below 1 act as 1.
    pub max_pages: u32,
    pub location: LocationFilter,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            page_size: None,
            max_pages: DEFAULT_MAX_PAGES,
            location: LocationFilter::Any,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedFetcher<C> {
    api: C,
    options: FeedOptions,
}

impl<C: StoryApi> FeedFetcher<C> {
    pub fn new(api: C, options: FeedOptions) -> Self {
        Self { api, options }
    }

    #[must_use]
    pub fn options(&self) -> &FeedOptions {
        &self.options
    }

    /// Fetch every page until the first empty one.
    pub async fn fetch_all(
        &self,
        token: &AuthToken,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoryItem>, FetchError> {
        let max_pages = self.options.max_pages.max(1);
        let mut query = PageQuery::first(self.options.page_size, self.options.location);
        let mut stories = Vec::new();

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(page = query.page, "Feed fetch cancelled before request");
                return Err(FetchError::Cancelled);
            }

            let page = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(page = query.page, "Feed fetch cancelled in flight");
                    return Err(FetchError::Cancelled);
                }
                result = self.api.list_stories(query, token) => result.map_err(|e| {
                    tracing::warn!(page = query.page, error = %e, "Feed page failed");
                    FetchError::from(e)
                })?,
            };

            tracing::debug!(page = query.page, items = page.len(), "Fetched feed page");
            if page.is_empty() {
                tracing::info!(pages = query.page - 1, stories = stories.len(), "Feed complete");
                return Ok(stories);
            }
            stories.extend(page);

            if query.page >= max_pages {
                tracing::warn!(max_pages, "Feed page limit reached without an empty page");
                return Err(FetchError::PageLimitExceeded { max_pages });
            }
            query = query.next();
        }
    }
}
