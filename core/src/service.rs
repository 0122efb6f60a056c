//! Login, feed and submission flows over an injected API client and session store.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use storyfeed_api::{ApiError, StoryApi, StoryUpload};
use storyfeed_media::{CompressedFile, CompressionError, MediaCompressor};
use storyfeed_session::{SessionError, SessionStore};
use storyfeed_types::{
    AuthToken, Email, NonEmptyString, Password, PendingUpload, Session, StoryItem, ValidationError,
};

use crate::feed::{FeedFetcher, FeedOptions, FetchError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not logged in")]
    NotAuthenticated,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Compression(#[from] CompressionError),
    #[error("failed to read upload {}: {source}", path.display())]
    ReadUpload {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What was sent for a submitted story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedStory {
    pub file_name: String,
    pub bytes_sent: u64,
    /// JPEG quality used, `None` when the original file was small enough.
    pub quality: Option<u8>,
}

pub struct StoryService<C, S> {
    api: C,
    store: S,
    compressor: MediaCompressor,
    feed_options: FeedOptions,
}

impl<C: StoryApi, S: SessionStore> StoryService<C, S> {
    pub fn new(api: C, store: S) -> Self {
        Self {
            api,
            store,
            compressor: MediaCompressor::default(),
            feed_options: FeedOptions::default(),
        }
    }

    #[must_use]
    pub fn with_compressor(mut self, compressor: MediaCompressor) -> Self {
        self.compressor = compressor;
        self
    }

    #[must_use]
    pub fn with_feed_options(mut self, options: FeedOptions) -> Self {
        self.feed_options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ServiceError> {
        let name = NonEmptyString::new(name.trim()).map_err(|_| ValidationError::BlankName)?;
        let email = Email::parse(email)?;
        let password = Password::parse(password)?;

        self.api.register(name.as_str(), &email, &password).await?;
        tracing::info!(email = %email, "Registered account");
        Ok(())
    }

    /// Log in and persist the session. The returned session is authenticated.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let email = Email::parse(email)?;
        let password = Password::parse(password)?;

        let result = self.api.login(&email, &password).await?;
        let token = AuthToken::new(result.token)
            .ok_or_else(|| ApiError::InvalidResponse("login returned an empty token".to_string()))?;

        let session = Session::authenticated(email.as_str(), result.name, token);
        self.store.save(&session)?;
        tracing::info!(email = %email, "Logged in");
        Ok(session)
    }

    pub fn logout(&self) -> Result<(), ServiceError> {
        self.store.clear()?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// The stored session, if it is authenticated.
    pub fn whoami(&self) -> Result<Option<Session>, ServiceError> {
        let session = self.store.load()?;
        Ok(session.is_authenticated().then_some(session))
    }

    pub async fn feed(&self, cancel: &CancellationToken) -> Result<Vec<StoryItem>, ServiceError> {
        let token = self.require_token()?;
        let stories = FeedFetcher::new(&self.api, self.feed_options)
            .fetch_all(&token, cancel)
            .await?;
        Ok(stories)
    }

    /// Compress and upload. The re-encoded copy is removed afterwards whether
    /// or not the upload succeeded.
    pub async fn submit(&self, upload: PendingUpload) -> Result<SubmittedStory, ServiceError> {
        let token = self.require_token()?;
        let (source, description) = upload.into_parts();

        let compressed = self.compressor.compress(&source).await?;
        let result = self.upload(&token, description, &compressed).await;
        if compressed.was_reencoded() {
            remove_attempt(&compressed.path).await;
        }
        result
    }

    async fn upload(
        &self,
        token: &AuthToken,
        description: String,
        compressed: &CompressedFile,
    ) -> Result<SubmittedStory, ServiceError> {
        let image = tokio::fs::read(&compressed.path)
            .await
            .map_err(|source| ServiceError::ReadUpload {
                path: compressed.path.clone(),
                source,
            })?;
        let file_name = compressed
            .path
            .file_name()
            .map_or_else(|| "photo.jpg".to_string(), |n| n.to_string_lossy().into_owned());
        let bytes_sent = image.len() as u64;

        self.api
            .create_story(
                token,
                StoryUpload {
                    description,
                    file_name: file_name.clone(),
                    image,
                },
            )
            .await?;
        tracing::info!(file_name = %file_name, bytes_sent, quality = ?compressed.quality, "Story submitted");

        Ok(SubmittedStory {
            file_name,
            bytes_sent,
            quality: compressed.quality,
        })
    }

    fn require_token(&self) -> Result<AuthToken, ServiceError> {
        self.store.token()?.ok_or(ServiceError::NotAuthenticated)
    }
}

async fn remove_attempt(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), "Failed to remove compressed upload: {e}");
    }
}
