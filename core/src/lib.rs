//! Story feed orchestration.
//!
//! - [`FeedFetcher`] walks the paginated story list until the first empty page.
//! - [`StoryService`] ties the API client, session store and compressor into the
//!   register/login/logout, feed and submit flows.

mod feed;
mod service;

pub use feed::{DEFAULT_MAX_PAGES, FeedFetcher, FeedOptions, FetchError};
pub use service::{ServiceError, StoryService, SubmittedStory};
