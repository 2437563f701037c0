//! Stream geometry inspection and aspect classification.
//!
//! `FfprobeInspector` shells out to `ffprobe -show_streams` and reads the
//! JSON it prints. The `MediaInspector` trait keeps the orchestrator free of
//! process handling so tests can substitute a fixed geometry.

use crate::models::aspect::{AspectClass, Geometry};
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ProbeError {
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
    #[error("unexpected probe output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no stream with non-zero dimensions in {}", .0.display())]
    NoDimensions(PathBuf),
}

/// Reads the geometry of a local media file.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    async fn inspect(&self, path: &Path) -> Result<Geometry, ProbeError>;
}

/// Inspect `path` and bucket its geometry.
pub async fn classify(
    inspector: &dyn MediaInspector,
    path: &Path,
) -> Result<AspectClass, ProbeError> {
    let geometry = inspector.inspect(path).await?;
    let class = AspectClass::from_geometry(geometry);
    debug!(
        width = geometry.width,
        height = geometry.height,
        %class,
        "classified upload"
    );
    Ok(class)
}

/// `MediaInspector` backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeInspector {
    program: PathBuf,
}

impl FfprobeInspector {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl MediaInspector for FfprobeInspector {
    async fn inspect(&self, path: &Path) -> Result<Geometry, ProbeError> {
        let program = self.program.display().to_string();
        debug!(%program, input = %path.display(), "running probe");

        // kill_on_drop: a dropped request future must not leave the probe running.
        let output = Command::new(&self.program)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(%program, status = %output.status, %stderr, "probe failed");
            return Err(ProbeError::Failed {
                program,
                status: output.status,
                stderr,
            });
        }

        parse_geometry(&output.stdout, path)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: Option<i64>,
    #[serde(default)]
    height: Option<i64>,
}

impl ProbeStream {
    fn geometry(&self) -> Option<Geometry> {
        let width = u32::try_from(self.width?).ok().filter(|w| *w > 0)?;
        let height = u32::try_from(self.height?).ok().filter(|h| *h > 0)?;
        Some(Geometry::new(width, height))
    }
}

/// Pick the first stream with both dimensions set, skipping audio and data streams.
fn parse_geometry(stdout: &[u8], path: &Path) -> Result<Geometry, ProbeError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    probe
        .streams
        .iter()
        .find_map(ProbeStream::geometry)
        .ok_or_else(|| ProbeError::NoDimensions(path.to_path_buf()))
}
