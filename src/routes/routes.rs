//! Defines routes for the video upload service.
//!
//! ## Structure
//! - **Probes**
//!   - `GET  /healthz` — liveness
//!   - `GET  /readyz` — readiness (record store + temp dir)
//!
//! - **Videos**
//!   - `POST /api/video_upload/{video_id}` — upload and process a video (multipart `video`)
//!   - `GET  /api/videos/{video_id}` — fetch a video with a signed playback URL

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        video_handlers::{get_video, upload_video},
    },
    services::upload_service::UploadService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: u64 = 1 << 20;

/// Build and return the router for all service routes.
///
/// The upload route's body limit is the configured ceiling plus multipart
/// overhead; the pipeline enforces the exact ceiling on the file part.
pub fn routes(max_upload_bytes: u64) -> Router<UploadService> {
    let body_limit = usize::try_from(max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES))
        .unwrap_or(usize::MAX);

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/api/video_upload/{video_id}",
            post(upload_video).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/videos/{video_id}", get(get_video))
}
