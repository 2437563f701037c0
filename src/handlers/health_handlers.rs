//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the record store and temp-dir I/O

use crate::services::upload_service::UploadService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Pings the record store (`SELECT 1`).
/// 2. Performs a write/read/delete in the upload temp directory, since every
///    upload is staged there.
///
/// HTTP 200 when all checks pass, HTTP 503 when any check fails.
pub async fn readyz(State(service): State<UploadService>) -> impl IntoResponse {
    let store_check = match service.videos().ping().await {
        Ok(()) => CheckStatus {
            ok: true,
            error: None,
        },
        Err(e) => CheckStatus {
            ok: false,
            error: Some(format!("error: {}", e)),
        },
    };

    let tmp_path = service
        .settings()
        .temp_dir
        .join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => {
            let read = fs::read(&tmp_path).await;
            let _ = fs::remove_file(&tmp_path).await;
            match read {
                Ok(bytes) if bytes == b"readyz" => CheckStatus {
                    ok: true,
                    error: None,
                },
                Ok(_) => CheckStatus {
                    ok: false,
                    error: Some("file content mismatch".to_string()),
                },
                Err(e) => CheckStatus {
                    ok: false,
                    error: Some(format!("could not read tmp file: {}", e)),
                },
            }
        }
        Err(e) => CheckStatus {
            ok: false,
            error: Some(format!("could not write tmp file: {}", e)),
        },
    };

    let overall_ok = store_check.ok && disk_check.ok;
    let mut checks = HashMap::new();
    checks.insert("record_store", store_check);
    checks.insert("temp_dir", disk_check);

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
