//! Turns persisted locations into playable URLs on every read.
//!
//! Signed URLs expire, so they are derived per request and never written back
//! to the record store.

use crate::{
    models::{location::PersistedLocation, video::VideoRecord},
    services::object_storage::{ObjectStorage, StoreError},
};
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// Validity window of signed playback URLs.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Clone)]
pub struct UrlResolver {
    storage: Arc<dyn ObjectStorage>,
    ttl: Duration,
}

impl UrlResolver {
    pub fn new(storage: Arc<dyn ObjectStorage>, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    /// Playable URL for `location`, or `None` when there is nothing to play.
    pub async fn resolve(&self, location: &PersistedLocation) -> Result<Option<String>, StoreError> {
        match location {
            PersistedLocation::Absent => Ok(None),
            PersistedLocation::Resolved(url) => Ok(Some(url.clone())),
            PersistedLocation::Unresolved(location) => {
                let url = self
                    .storage
                    .signed_get_url(&location.bucket, &location.key, self.ttl)
                    .await?;
                debug!(
                    bucket = %location.bucket,
                    key = %location.key,
                    ttl_secs = self.ttl.as_secs(),
                    "signed playback url"
                );
                Ok(Some(url))
            }
        }
    }

    /// Replace a record's `video_url` with a playable URL.
    ///
    /// Records without a location, with an absolute URL, or with a malformed
    /// field are returned untouched.
    pub async fn resolve_record(&self, mut video: VideoRecord) -> Result<VideoRecord, StoreError> {
        let location = PersistedLocation::from_field(video.video_url.as_deref());
        if let PersistedLocation::Unresolved(_) = location {
            video.video_url = self.resolve(&location).await?;
        }
        Ok(video)
    }
}
