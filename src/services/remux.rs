//! Fast-start remux: move the container index to the front of the file with a
//! lossless stream copy so playback can begin before the download finishes.

use async_trait::async_trait;
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};
use thiserror::Error;
use tokio::{fs, process::Command};
use tracing::{debug, error, info};

const PROCESSING_SUFFIX: &str = ".processing";

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("remux reported success but {} was not written", .0.display())]
    MissingOutput(PathBuf),
}

/// Produces a streaming-friendly copy of a local media file.
#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Remux `input` and return the path of the new file.
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError>;
}

/// Output path for a remux of `input`: `<input>.processing`, next to the input.
pub fn processing_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(PROCESSING_SUFFIX);
    PathBuf::from(name)
}

/// `Remuxer` backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    program: PathBuf,
}

impl FfmpegRemuxer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        let program = self.program.display().to_string();
        let output_path = processing_path(input);
        debug!(
            %program,
            input = %input.display(),
            output = %output_path.display(),
            "running fast-start remux"
        );

        // The output has no media extension, so the muxer is forced with `-f mp4`.
        let output = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RemuxError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(%program, status = %output.status, %stderr, "remux failed");
            discard_partial(&output_path).await;
            return Err(RemuxError::Failed {
                program,
                status: output.status,
                stderr,
            });
        }

        if !fs::try_exists(&output_path).await.unwrap_or(false) {
            return Err(RemuxError::MissingOutput(output_path));
        }

        info!(output = %output_path.display(), "remux complete");
        Ok(output_path)
    }
}

/// Best-effort removal of whatever a failed run left behind.
async fn discard_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(_) => debug!("removed partial remux output {}", path.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => debug!("failed to remove partial output {}: {}", path.display(), err),
    }
}
