//! Story feed items and pending uploads.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NonEmptyString, ValidationError};

/// One story as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl StoryItem {
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// The `location` query parameter of the list endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationFilter {
    /// All stories (`location=0`).
    #[default]
    Any,
    /// Only stories carrying coordinates (`location=1`).
    WithLocation,
}

impl LocationFilter {
    #[must_use]
    pub const fn query_value(self) -> u8 {
        match self {
            Self::Any => 0,
            Self::WithLocation => 1,
        }
    }
}

/// A story the user has finalized but not yet sent.
///
/// Consumed by value when the upload is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    source_path: PathBuf,
    description: NonEmptyString,
}

impl PendingUpload {
    pub fn new(
        source_path: impl Into<PathBuf>,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let description =
            NonEmptyString::new(description).map_err(|_| ValidationError::BlankDescription)?;
        Ok(Self {
            source_path: source_path.into(),
            description,
        })
    }

    #[must_use]
    pub fn into_parts(self) -> (PathBuf, String) {
        (self.source_path, self.description.into_inner())
    }
}
