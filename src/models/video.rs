//! Represents a video record owned by the record store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A video entry as persisted in the record store.
///
/// `video_url` holds the persisted location field: either a `bucket,key`
/// token written by the upload pipeline or an absolute URL. It is only ever
/// written after the object has been stored successfully.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct VideoRecord {
    /// Video identifier.
    pub id: Uuid,

    /// ID of the user that owns this video.
    pub user_id: Uuid,

    pub title: String,

    pub description: String,

    /// Absolute URL of the thumbnail, if one was uploaded.
    pub thumbnail_url: Option<String>,

    /// Persisted location of the processed video, or a resolved URL in responses.
    pub video_url: Option<String>,

    /// When this record was created.
    pub created_at: DateTime<Utc>,

    /// When this record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a fresh record without any uploaded media.
    pub fn new(user_id: Uuid, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: description.into(),
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}
