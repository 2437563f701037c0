//! Object storage for processed videos.
//!
//! `ObjectStorage` is the narrow seam the pipeline needs: one whole-object
//! write into the configured bucket and signed GET URLs. `S3Storage` implements
//! it with `object_store`'s Amazon S3 client, which also covers S3-compatible
//! providers through a custom endpoint.

use crate::models::{aspect::AspectClass, location::StorageLocation};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use http::Method;
use object_store::{
    Attribute, Attributes, ObjectStore, PutOptions, PutPayload,
    aws::{AmazonS3, AmazonS3Builder},
    path::Path as ObjectPath,
    signer::Signer,
};
use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info};

/// Bytes of randomness behind every object key.
pub const KEY_ENTROPY_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("upload of `{key}` to bucket `{bucket}` failed: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("signing `{key}` in bucket `{bucket}` failed: {message}")]
    Sign {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("object store configuration error: {0}")]
    Config(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Bucket that `put_file` writes into.
    fn bucket(&self) -> &str;

    /// Write the whole file at `path` under `key` in a single request.
    /// `S3Storage` buffers the file in memory for the request.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str)
    -> Result<(), StoreError>;

    /// Produce a GET URL for `bucket/key` that stops working after `expires_in`.
    async fn signed_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError>;
}

/// Build a fresh key `<class>/<base64url(32 random bytes)>.mp4`.
///
/// 256 bits of randomness make the key space collision-free in practice, so
/// uploads never overwrite each other.
pub fn generate_video_key(class: AspectClass) -> String {
    let entropy: [u8; KEY_ENTROPY_BYTES] = rand::random();
    format!("{}/{}.mp4", class, URL_SAFE_NO_PAD.encode(entropy))
}

/// Upload a processed video under a key namespaced by its aspect class.
pub async fn upload_video_object(
    storage: &dyn ObjectStorage,
    class: AspectClass,
    path: &Path,
    content_type: &str,
) -> Result<StorageLocation, StoreError> {
    let key = generate_video_key(class);
    storage.put_file(&key, path, content_type).await?;
    Ok(StorageLocation::new(storage.bucket(), key))
}

/// `ObjectStorage` backed by Amazon S3 (or any S3-compatible endpoint).
#[derive(Debug, Clone)]
pub struct S3Storage {
    store: AmazonS3,
    builder: AmazonS3Builder,
    bucket: String,
}

impl S3Storage {
    /// Build a client for `bucket`, taking credentials from the standard AWS
    /// environment variables.
    ///
    /// `endpoint_url` targets an S3-compatible provider such as MinIO
    /// (`http://localhost:9000`); plain HTTP is only allowed for such endpoints.
    pub fn from_env(
        bucket: &str,
        region: &str,
        endpoint_url: Option<&str>,
    ) -> Result<Self, StoreError> {
        let mut builder = AmazonS3Builder::from_env().with_region(region);
        if let Some(endpoint) = endpoint_url {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        Self::from_builder(builder, bucket)
    }

    /// Build a client from a prepared builder; the bucket is set here.
    pub fn from_builder(builder: AmazonS3Builder, bucket: &str) -> Result<Self, StoreError> {
        let store = builder
            .clone()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;
        Ok(Self {
            store,
            builder,
            bucket: bucket.to_string(),
        })
    }

    /// Client for `bucket`. Records written before a bucket change still point
    /// at the old bucket, so signing may need a client for a different one.
    fn store_for(&self, bucket: &str) -> Result<AmazonS3, StoreError> {
        if bucket == self.bucket {
            return Ok(self.store.clone());
        }
        self.builder
            .clone()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let data = fs::read(path).await.map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let size = data.len() as u64;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let start = Instant::now();
        let location = ObjectPath::from(key);
        self.store
            .put_opts(&location, PutPayload::from(data), opts)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StoreError::Upload {
                    bucket: self.bucket.clone(),
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;

        info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(())
    }

    async fn signed_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        let store = self.store_for(bucket)?;
        let location = ObjectPath::from(key);
        let url = store
            .signed_url(Method::GET, &location, expires_in)
            .await
            .map_err(|e| StoreError::Sign {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(url.to_string())
    }
}
