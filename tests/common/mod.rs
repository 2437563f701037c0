#![allow(dead_code)]

//! In-memory collaborators for driving `UploadService` without ffmpeg, S3,
//! or a database.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tempfile::TempDir;
use tubely::{
    models::{aspect::Geometry, upload::UploadRequest, video::VideoRecord},
    services::{
        identity::{JwtVerifier, issue_token},
        media_probe::{MediaInspector, ProbeError},
        object_storage::{ObjectStorage, StoreError},
        remux::{RemuxError, Remuxer, processing_path},
        upload_service::{UploadService, UploadSettings},
        video_store::{RecordStoreError, RecordStoreResult, VideoStore},
    },
};
use uuid::Uuid;

pub const SECRET: &str = "test-secret";
pub const BUCKET: &str = "tubely-test";
pub const MP4: &str = "video/mp4";

#[derive(Default)]
pub struct MemoryVideoStore {
    records: Mutex<HashMap<Uuid, VideoRecord>>,
    pub fail_update: AtomicBool,
}

impl MemoryVideoStore {
    /// The record exactly as stored, without URL resolution.
    pub fn raw(&self, id: Uuid) -> Option<VideoRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn get(&self, id: Uuid) -> RecordStoreResult<Option<VideoRecord>> {
        Ok(self.raw(id))
    }

    async fn update(&self, video: &VideoRecord) -> RecordStoreResult<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&video.id) {
            Some(existing) => {
                *existing = video.clone();
                Ok(())
            }
            None => Err(RecordStoreError::NotFound(video.id)),
        }
    }

    async fn create(&self, video: &VideoRecord) -> RecordStoreResult<()> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&video.id) {
            return Err(RecordStoreError::AlreadyExists(video.id));
        }
        records.insert(video.id, video.clone());
        Ok(())
    }

    async fn ping(&self) -> RecordStoreResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    pub fail_put: AtomicBool,
    pub fail_sign: AtomicBool,
}

impl MemoryStorage {
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    fn bucket(&self) -> &str {
        BUCKET
    }

    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<(), StoreError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StoreError::Upload {
                bucket: BUCKET.to_string(),
                key: key.to_string(),
                message: "service unavailable".to_string(),
            });
        }
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| StoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn signed_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        if self.fail_sign.load(Ordering::SeqCst) {
            return Err(StoreError::Sign {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "access denied".to_string(),
            });
        }
        Ok(format!(
            "https://{}.s3.test/{}?X-Amz-Expires={}&X-Amz-Signature=fake",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

/// Reports a fixed geometry, or no video stream when `fail` is set.
pub struct FakeInspector {
    pub geometry: Geometry,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeInspector {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            geometry: Geometry::new(width, height),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaInspector for FakeInspector {
    async fn inspect(&self, path: &Path) -> Result<Geometry, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "probe ran before the upload was staged");
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProbeError::NoDimensions(path.to_path_buf()));
        }
        Ok(self.geometry)
    }
}

/// Copies the input to the processing path instead of running ffmpeg.
#[derive(Default)]
pub struct CopyRemuxer {
    pub fail: AtomicBool,
    /// Write the output, then never finish.
    pub hang: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Remuxer for CopyRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = processing_path(input);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemuxError::MissingOutput(output));
        }
        tokio::fs::copy(input, &output)
            .await
            .map_err(|source| RemuxError::Spawn {
                program: "copy".to_string(),
                source,
            })?;
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(output)
    }
}

pub struct Harness {
    pub service: UploadService,
    pub videos: Arc<MemoryVideoStore>,
    pub storage: Arc<MemoryStorage>,
    pub inspector: Arc<FakeInspector>,
    pub remuxer: Arc<CopyRemuxer>,
    pub temp_dir: TempDir,
}

impl Harness {
    /// 1920x1080 uploads, 1 KiB ceiling.
    pub fn new() -> Self {
        Self::with_geometry(1920, 1080)
    }

    pub fn with_geometry(width: u32, height: u32) -> Self {
        Self::build(width, height, 1024)
    }

    pub fn build(width: u32, height: u32, max_upload_bytes: u64) -> Self {
        let videos = Arc::new(MemoryVideoStore::default());
        let storage = Arc::new(MemoryStorage::default());
        let inspector = Arc::new(FakeInspector::new(width, height));
        let remuxer = Arc::new(CopyRemuxer::default());
        let temp_dir = tempfile::tempdir().unwrap();

        let service = UploadService::new(
            videos.clone(),
            Arc::new(JwtVerifier::new(SECRET)),
            inspector.clone(),
            remuxer.clone(),
            storage.clone(),
            UploadSettings {
                max_upload_bytes,
                temp_dir: temp_dir.path().to_path_buf(),
                signed_url_ttl: Duration::from_secs(900),
            },
        );

        Self {
            service,
            videos,
            storage,
            inspector,
            remuxer,
            temp_dir,
        }
    }

    /// Insert a fresh record owned by `owner`.
    pub async fn seed_video(&self, owner: Uuid) -> VideoRecord {
        let video = VideoRecord::new(owner, "Boots", "a short clip");
        self.videos.create(&video).await.unwrap();
        video
    }

    /// Entries left behind in the upload temp directory.
    pub fn staged_entries(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path()).unwrap().count()
    }

    pub fn inspections(&self) -> usize {
        self.inspector.calls.load(Ordering::SeqCst)
    }

    pub fn remuxes(&self) -> usize {
        self.remuxer.calls.load(Ordering::SeqCst)
    }
}

pub fn token_for(user_id: Uuid) -> String {
    issue_token(SECRET, user_id, Duration::from_secs(300)).unwrap()
}

pub type BodyStream = stream::Iter<std::vec::IntoIter<io::Result<Bytes>>>;

/// Body delivered in small chunks, the way multipart parts arrive.
pub fn body_of(data: &[u8]) -> BodyStream {
    let chunks: Vec<io::Result<Bytes>> = data
        .chunks(4)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    stream::iter(chunks)
}

pub fn upload_request(
    video_id: Uuid,
    token: String,
    content_type: &str,
    data: &[u8],
) -> UploadRequest<BodyStream> {
    UploadRequest {
        video_id,
        bearer_token: token,
        content_type: content_type.to_string(),
        body: body_of(data),
    }
}

/// A 64-byte stand-in for an mp4 file.
pub fn sample_video() -> Vec<u8> {
    let mut data = b"\x00\x00\x00\x20ftypisom".to_vec();
    data.resize(64, 0xab);
    data
}
