//! src/services/upload_service.rs
//!
//! UploadService — sequences one video upload:
//! validate → authorize → stage → classify → remux → store → persist → resolve.
//!
//! Every stage runs in order on the request task; nothing is retried. Staged
//! and remuxed files live in a per-request temporary directory that is removed
//! when the request finishes, fails, or is dropped because the client went away.

use crate::{
    models::{
        aspect::AspectClass,
        location::StorageLocation,
        upload::{UploadKind, UploadRequest},
        video::VideoRecord,
    },
    services::{
        identity::{AuthError, IdentityVerifier},
        media_probe::{self, MediaInspector, ProbeError},
        object_storage::{self, ObjectStorage, StoreError},
        remux::{RemuxError, Remuxer},
        url_resolver::UrlResolver,
        video_store::{RecordStoreError, VideoStore},
    },
};
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tempfile::TempDir;
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tokio_util::io::StreamReader;
use tracing::{info, warn};
use uuid::Uuid;

/// Name of the staged upload inside the request's temp directory.
const STAGED_FILE_NAME: &str = "upload.mp4";

/// Problems with the request itself. Nothing has been written when these occur.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid video id `{0}`")]
    InvalidVideoId(String),
    #[error("missing multipart field `{0}`")]
    MissingField(&'static str),
    #[error("unsupported content type `{found}`, expected one of: {}", .expected.join(", "))]
    ContentType {
        found: String,
        expected: &'static [&'static str],
    },
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("malformed multipart body: {0}")]
    Multipart(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("authentication failed: {0}")]
    Unauthenticated(#[from] AuthError),
    #[error("user `{caller}` does not own video `{video_id}`")]
    Forbidden { caller: Uuid, video_id: Uuid },
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error("loading video `{video_id}` failed: {source}")]
    Lookup {
        video_id: Uuid,
        #[source]
        source: RecordStoreError,
    },
    #[error("staging the upload failed: {0}")]
    Staging(#[from] io::Error),
    #[error("probing the upload failed: {0}")]
    Probe(#[from] ProbeError),
    #[error("fast-start remux failed: {0}")]
    Remux(#[from] RemuxError),
    #[error("storing the upload failed: {0}")]
    Store(#[from] StoreError),
    #[error("saving video `{video_id}` failed after storing `{key}`: {source}")]
    Persist {
        video_id: Uuid,
        key: String,
        #[source]
        source: RecordStoreError,
    },
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Limits and locations the pipeline runs with.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Hard ceiling on the uploaded body, enforced while reading.
    pub max_upload_bytes: u64,

    /// Parent directory for per-request temp directories.
    pub temp_dir: PathBuf,

    /// Validity window of signed playback URLs.
    pub signed_url_ttl: Duration,
}

/// UploadService owns the upload pipeline and the read path.
///
/// All collaborators sit behind `Arc`, so cloning is cheap and concurrent
/// requests share no mutable state.
#[derive(Clone)]
pub struct UploadService {
    videos: Arc<dyn VideoStore>,
    identity: Arc<dyn IdentityVerifier>,
    inspector: Arc<dyn MediaInspector>,
    remuxer: Arc<dyn Remuxer>,
    storage: Arc<dyn ObjectStorage>,
    resolver: UrlResolver,
    settings: UploadSettings,
}

impl UploadService {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        identity: Arc<dyn IdentityVerifier>,
        inspector: Arc<dyn MediaInspector>,
        remuxer: Arc<dyn Remuxer>,
        storage: Arc<dyn ObjectStorage>,
        settings: UploadSettings,
    ) -> Self {
        let resolver = UrlResolver::new(storage.clone(), settings.signed_url_ttl);
        Self {
            videos,
            identity,
            inspector,
            remuxer,
            storage,
            resolver,
            settings,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    pub fn videos(&self) -> &dyn VideoStore {
        self.videos.as_ref()
    }

    /// Run the full upload pipeline and return the updated record with a
    /// playable URL.
    ///
    /// The body stream is not touched until the caller has been verified as
    /// the owner of the video, so rejected requests never reach the disk.
    pub async fn upload_video<S>(&self, request: UploadRequest<S>) -> UploadResult<VideoRecord>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let UploadRequest {
            video_id,
            bearer_token,
            content_type,
            body,
        } = request;

        let media_type = UploadKind::Video
            .match_content_type(&content_type)
            .ok_or_else(|| ValidationError::ContentType {
                found: content_type.clone(),
                expected: UploadKind::Video.accepted_types(),
            })?;

        let mut video = self.authorize(&bearer_token, video_id).await?;
        info!(%video_id, user_id = %video.user_id, "upload authorized");

        let staging = self.stage(body).await?;
        let staged = staging.path().join(STAGED_FILE_NAME);

        let class = media_probe::classify(self.inspector.as_ref(), &staged).await?;
        info!(%video_id, %class, "upload classified");

        let processed = self.remuxer.remux(&staged).await?;
        let location = self.store(class, &processed, media_type).await?;
        info!(%video_id, bucket = %location.bucket, key = %location.key, "upload stored");

        video.video_url = Some(location.encode());
        video.updated_at = Utc::now();
        if let Err(source) = self.videos.update(&video).await {
            // The object exists but nothing references it; leave it for cleanup.
            warn!(
                %video_id,
                bucket = %location.bucket,
                key = %location.key,
                error = %source,
                "stored object orphaned by failed record update"
            );
            return Err(UploadError::Persist {
                video_id,
                key: location.key,
                source,
            });
        }
        info!(%video_id, "upload persisted");

        drop(staging);
        // The upload is complete once the record is saved; readers sign again.
        match self.resolver.resolve_record(video.clone()).await {
            Ok(resolved) => Ok(resolved),
            Err(err) => {
                warn!(%video_id, error = %err, "signing the playback url failed after upload");
                video.video_url = None;
                Ok(video)
            }
        }
    }

    /// Fetch a record with its playback URL resolved for this request.
    pub async fn get_video(&self, video_id: Uuid) -> UploadResult<VideoRecord> {
        let video = self.load(video_id).await?;
        Ok(self.resolver.resolve_record(video).await?)
    }

    /// Verify the caller and check ownership. Credentials are verified once
    /// per request and never cached.
    async fn authorize(&self, bearer_token: &str, video_id: Uuid) -> UploadResult<VideoRecord> {
        let caller = self.identity.verify(bearer_token)?;
        let video = self.load(video_id).await?;
        if video.user_id != caller {
            warn!(%video_id, %caller, owner = %video.user_id, "upload by non-owner rejected");
            return Err(UploadError::Forbidden { caller, video_id });
        }
        Ok(video)
    }

    async fn load(&self, video_id: Uuid) -> UploadResult<VideoRecord> {
        self.videos
            .get(video_id)
            .await
            .map_err(|source| UploadError::Lookup { video_id, source })?
            .ok_or(UploadError::NotFound(video_id))
    }

    /// Copy the body into a fresh temp directory, enforcing the byte ceiling
    /// while reading. The returned guard deletes the directory on drop.
    async fn stage<S>(&self, body: S) -> UploadResult<TempDir>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let staging = tempfile::Builder::new()
            .prefix("tubely-upload-")
            .tempdir_in(&self.settings.temp_dir)?;
        let path = staging.path().join(STAGED_FILE_NAME);
        let limit = self.settings.max_upload_bytes;

        let written = copy_limited(body, &path, limit).await.map_err(|err| {
            if err.kind() == ErrorKind::InvalidData {
                UploadError::Validation(ValidationError::Multipart(err.to_string()))
            } else {
                UploadError::Staging(err)
            }
        })?;
        if written > limit {
            return Err(ValidationError::TooLarge { limit }.into());
        }

        info!(path = %path.display(), size_bytes = written, "upload staged");
        Ok(staging)
    }

    async fn store(
        &self,
        class: AspectClass,
        processed: &Path,
        media_type: &str,
    ) -> UploadResult<StorageLocation> {
        let location =
            object_storage::upload_video_object(self.storage.as_ref(), class, processed, media_type)
                .await?;
        Ok(location)
    }
}

/// Stream `body` into a new file at `path`, reading at most `limit + 1` bytes.
///
/// Returns the number of bytes written; a value above `limit` means the body
/// was too large and the file is incomplete.
async fn copy_limited<S>(body: S, path: &Path, limit: u64) -> io::Result<u64>
where
    S: Stream<Item = io::Result<Bytes>> + Send,
{
    let mut file = File::create(path).await?;
    let reader = StreamReader::new(Box::pin(body));
    let mut limited = reader.take(limit.saturating_add(1));
    let written = tokio::io::copy(&mut limited, &mut file).await?;
    file.flush().await?;
    if written <= limit {
        file.sync_all().await?;
    } else {
        drop(file);
        let _ = fs::remove_file(path).await;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &'static [&'static [u8]]) -> impl Stream<Item = io::Result<Bytes>> + Send {
        stream::iter(parts.iter().map(|p| Ok(Bytes::from_static(p))))
    }

    #[tokio::test]
    async fn copy_within_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.mp4");
        let written = copy_limited(chunks(&[b"abc", b"def"]), &path, 6).await.unwrap();
        assert_eq!(written, 6);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn copy_stops_one_byte_past_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.mp4");
        let written = copy_limited(chunks(&[b"abc", b"defgh", b"ijk"]), &path, 5)
            .await
            .unwrap();
        assert_eq!(written, 6);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn stream_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.mp4");
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::new(ErrorKind::InvalidData, "truncated part")),
        ]);
        let err = copy_limited(body, &path, 100).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
