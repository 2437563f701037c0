use crate::services::url_resolver::SIGNED_URL_TTL;
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Default ceiling on a single upload: 1 GiB.
///
/// `S3Storage::put_file` holds the whole remuxed file in memory during the
/// put, so peak memory is roughly this ceiling times the number of
/// concurrent uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1 << 30;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub jwt_secret: String,
    pub max_upload_bytes: u64,
    pub temp_dir: PathBuf,
    pub ffprobe_bin: PathBuf,
    pub ffmpeg_bin: PathBuf,
    pub signed_url_ttl: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Video upload and processing API")]
pub struct Args {
    /// Host to bind to (overrides TUBELY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TUBELY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides TUBELY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bucket receiving processed videos (overrides S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Bucket region (overrides S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom S3 endpoint, e.g. a local MinIO (overrides S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Maximum upload size in bytes (overrides TUBELY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,

    /// Parent directory for per-upload temp files (overrides TUBELY_TEMP_DIR)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// ffprobe executable (overrides FFPROBE_BIN)
    #[arg(long)]
    pub ffprobe_bin: Option<PathBuf>,

    /// ffmpeg executable (overrides FFMPEG_BIN)
    #[arg(long)]
    pub ffmpeg_bin: Option<PathBuf>,

    /// Lifetime of signed playback URLs in seconds (overrides TUBELY_SIGNED_URL_TTL_SECS)
    #[arg(long)]
    pub signed_url_ttl_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::from_args(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge parsed arguments over values from `lookup`, which stands in for
    /// the process environment.
    pub fn from_args(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = lookup("TUBELY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "TUBELY_PORT")?.unwrap_or(8091);
        let env_db =
            lookup("TUBELY_DATABASE_URL").unwrap_or_else(|| "sqlite://./data/tubely.db".into());
        let env_region = lookup("S3_REGION").unwrap_or_else(|| "us-east-1".into());
        let env_max = parse_var(&lookup, "TUBELY_MAX_UPLOAD_BYTES")?;
        let env_ttl = parse_var(&lookup, "TUBELY_SIGNED_URL_TTL_SECS")?;

        // --- Required ---
        let s3_bucket = args
            .s3_bucket
            .or_else(|| lookup("S3_BUCKET"))
            .filter(|b| !b.is_empty())
            .ok_or_else(|| anyhow!("S3_BUCKET must be set (or pass --s3-bucket)"))?;
        // Secrets stay out of argv.
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        // --- Merge ---
        let max_upload_bytes = args
            .max_upload_bytes
            .or(env_max)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        if max_upload_bytes == 0 {
            return Err(anyhow!("max upload size must be greater than zero"));
        }
        let ttl_secs = args
            .signed_url_ttl_secs
            .or(env_ttl)
            .unwrap_or(SIGNED_URL_TTL.as_secs());
        if ttl_secs == 0 {
            return Err(anyhow!("signed URL lifetime must be greater than zero"));
        }

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            s3_bucket,
            s3_region: args.s3_region.unwrap_or(env_region),
            s3_endpoint: args
                .s3_endpoint
                .or_else(|| lookup("S3_ENDPOINT"))
                .filter(|e| !e.is_empty()),
            jwt_secret,
            max_upload_bytes,
            temp_dir: args
                .temp_dir
                .or_else(|| lookup("TUBELY_TEMP_DIR").map(PathBuf::from))
                .unwrap_or_else(env::temp_dir),
            ffprobe_bin: args
                .ffprobe_bin
                .or_else(|| lookup("FFPROBE_BIN").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("ffprobe")),
            ffmpeg_bin: args
                .ffmpeg_bin
                .or_else(|| lookup("FFMPEG_BIN").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            signed_url_ttl: Duration::from_secs(ttl_secs),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(None),
    }
}
