use anyhow::Result;
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tubely::{
    config::AppConfig,
    routes,
    services::{
        identity::JwtVerifier,
        media_probe::FfprobeInspector,
        object_storage::S3Storage,
        remux::FfmpegRemuxer,
        upload_service::{UploadService, UploadSettings},
        video_store::{SqliteVideoStore, run_migrations},
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!(
        addr = %cfg.addr(),
        database_url = %cfg.database_url,
        bucket = %cfg.s3_bucket,
        region = %cfg.s3_region,
        endpoint = ?cfg.s3_endpoint,
        max_upload_bytes = cfg.max_upload_bytes,
        temp_dir = %cfg.temp_dir.display(),
        signed_url_ttl_secs = cfg.signed_url_ttl.as_secs(),
        "Starting tubely"
    );

    // --- Ensure temp directory exists ---
    if !cfg.temp_dir.exists() {
        fs::create_dir_all(&cfg.temp_dir)?;
        tracing::info!("Created temp directory at {}", cfg.temp_dir.display());
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    // Create parent directory if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let db: Arc<sqlx::Pool<sqlx::Sqlite>> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(SqliteConnectOptions::from_str(db_url)?.create_if_missing(true))
            .await?,
    );

    // --- Handle migration mode ---
    if migrate {
        let applied = run_migrations(&db).await?;
        tracing::info!("Database migration complete ({} statements).", applied);
        return Ok(()); // exit after migration
    }

    // --- Initialize pipeline collaborators ---
    let storage = S3Storage::from_env(&cfg.s3_bucket, &cfg.s3_region, cfg.s3_endpoint.as_deref())?;
    let service = UploadService::new(
        Arc::new(SqliteVideoStore::new(db.clone())),
        Arc::new(JwtVerifier::new(&cfg.jwt_secret)),
        Arc::new(FfprobeInspector::new(cfg.ffprobe_bin.clone())),
        Arc::new(FfmpegRemuxer::new(cfg.ffmpeg_bin.clone())),
        Arc::new(storage),
        UploadSettings {
            max_upload_bytes: cfg.max_upload_bytes,
            temp_dir: cfg.temp_dir.clone(),
            signed_url_ttl: cfg.signed_url_ttl,
        },
    );

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes)
        .with_state(service)
        .layer(TraceLayer::new_for_http());

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
