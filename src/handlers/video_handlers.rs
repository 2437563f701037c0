//! HTTP handlers for video uploads and reads.
//! The multipart `video` part is streamed straight into the pipeline; the
//! handler only extracts the request pieces and delegates to `UploadService`.

use crate::{
    errors::AppError,
    models::{upload::UploadRequest, video::VideoRecord},
    services::{
        identity::bearer_token,
        upload_service::{UploadError, UploadService, ValidationError},
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::HeaderMap,
};
use futures::TryStreamExt;
use std::io;
use uuid::Uuid;

/// Multipart part carrying the video bytes.
const VIDEO_FIELD: &str = "video";

/// `POST /api/video_upload/{video_id}` — upload and process a video.
pub async fn upload_video(
    State(service): State<UploadService>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<VideoRecord>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let token = bearer_token(&headers).map_err(UploadError::from)?.to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ValidationError::Multipart(e.body_text()))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        // Body read failures are the client's fault, so they surface as InvalidData.
        let body = field.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.body_text()));

        let video = service
            .upload_video(UploadRequest {
                video_id,
                bearer_token: token,
                content_type,
                body,
            })
            .await?;
        return Ok(Json(video));
    }

    Err(ValidationError::MissingField(VIDEO_FIELD).into())
}

/// `GET /api/videos/{video_id}` — fetch a video with a playable URL.
pub async fn get_video(
    State(service): State<UploadService>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoRecord>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let video = service.get_video(video_id).await?;
    Ok(Json(video))
}

fn parse_video_id(raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw).map_err(|_| ValidationError::InvalidVideoId(raw.to_string()))
}
