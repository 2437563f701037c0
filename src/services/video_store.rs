//! Record store for video metadata.
//!
//! The upload pipeline only needs `get` and `update`; the store is treated as
//! transactional per call and nothing here retries. `SqliteVideoStore` keeps
//! the records in SQLite through a shared sqlx pool.

use crate::models::video::VideoRecord;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Schema applied by `--migrate`.
const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error("video `{0}` already exists")]
    AlreadyExists(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Fetch a record, `None` when the id is unknown.
    async fn get(&self, id: Uuid) -> RecordStoreResult<Option<VideoRecord>>;

    /// Overwrite the mutable fields of an existing record.
    async fn update(&self, video: &VideoRecord) -> RecordStoreResult<()>;

    async fn create(&self, video: &VideoRecord) -> RecordStoreResult<()>;

    /// Cheap connectivity check used by the readiness probe.
    async fn ping(&self) -> RecordStoreResult<()>;
}

#[derive(Clone)]
pub struct SqliteVideoStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteVideoStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoStore for SqliteVideoStore {
    async fn get(&self, id: Uuid) -> RecordStoreResult<Option<VideoRecord>> {
        let video = sqlx::query_as::<_, VideoRecord>(
            "SELECT id, user_id, title, description, thumbnail_url, video_url,
                    created_at, updated_at
             FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(video)
    }

    async fn update(&self, video: &VideoRecord) -> RecordStoreResult<()> {
        let result = sqlx::query(
            "UPDATE videos
             SET title = ?, description = ?, thumbnail_url = ?, video_url = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.updated_at)
        .bind(video.id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RecordStoreError::NotFound(video.id));
        }
        debug!(video_id = %video.id, "updated video record");
        Ok(())
    }

    async fn create(&self, video: &VideoRecord) -> RecordStoreResult<()> {
        match sqlx::query(
            "INSERT INTO videos (id, user_id, title, description, thumbnail_url, video_url,
                                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(video.id)
        .bind(video.user_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(RecordStoreError::AlreadyExists(video.id)),
            Err(err) => Err(RecordStoreError::Sqlx(err)),
        }
    }

    async fn ping(&self) -> RecordStoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}

/// Apply the embedded schema. Returns the number of statements executed.
pub async fn run_migrations(db: &SqlitePool) -> Result<usize, sqlx::Error> {
    let statements = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for stmt in &statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(statements.len())
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
