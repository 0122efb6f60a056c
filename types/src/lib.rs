//! Core domain types for storyfeed.
//!
//! Sessions, stories, pending uploads and validated credentials. No IO, no
//! async: the other crates share these as plain values.

mod credentials;
mod session;
mod story;

pub use credentials::{Email, Password, ValidationError};
pub use session::{AuthToken, Session};
pub use story::{LocationFilter, PendingUpload, StoryItem};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text that is not blank. Surrounding whitespace is kept as given.
///
/// Story descriptions and account names are sent as typed, but a value that is
/// only whitespace never leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("text must not be blank")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(EmptyStringError);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.into_inner()
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
