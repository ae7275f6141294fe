//! Aspect ratio detection through ffprobe.

use serde::Deserialize;
use std::{
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
};
use thiserror::Error;
use tokio::process::Command;

/// Maximum distance from a target ratio that still counts as a match.
const TOLERANCE: f64 = 0.1;
const LANDSCAPE: f64 = 16.0 / 9.0;
const PORTRAIT: f64 = 9.0 / 16.0;

/// Coarse orientation of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Landscape,
    Portrait,
    Other,
}

impl AspectRatio {
    /// Classify pixel dimensions. 16:9 is checked before 9:16.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        let ratio = f64::from(width) / f64::from(height);
        if is_close(ratio, LANDSCAPE) {
            AspectRatio::Landscape
        } else if is_close(ratio, PORTRAIT) {
            AspectRatio::Portrait
        } else {
            AspectRatio::Other
        }
    }

    /// The label: `16:9`, `9:16` or `other`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Other => "other",
        }
    }

    /// Storage key prefix for videos of this shape.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "landscape",
            AspectRatio::Portrait => "portrait",
            AspectRatio::Other => "other",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// NaN (0/0) compares false, so degenerate dimensions fall through to Other.
fn is_close(ratio: f64, target: f64) -> bool {
    (ratio - target).abs() < TOLERANCE
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to execute ffprobe: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffprobe exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("failed to parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no streams found in the video")]
    NoStreams,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Width and height of the first stream in ffprobe's JSON output.
pub fn parse_dimensions(stdout: &[u8]) -> Result<(u32, u32), ProbeError> {
    let output: ProbeOutput = serde_json::from_slice(stdout)?;
    let first = output.streams.first().ok_or(ProbeError::NoStreams)?;
    Ok((first.width, first.height))
}

/// Runs ffprobe against local files.
#[derive(Debug, Clone)]
pub struct AspectProbe {
    program: PathBuf,
}

impl AspectProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Probe `path` and classify its first stream.
    pub async fn aspect_ratio(&self, path: &Path) -> Result<AspectRatio, ProbeError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        tracing::debug!(program = %self.program.display(), file = %path.display(), "running ffprobe");

        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(ProbeError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let (width, height) = parse_dimensions(&output.stdout)?;
        let aspect = AspectRatio::from_dimensions(width, height);
        tracing::debug!(width, height, %aspect, "classified video");
        Ok(aspect)
    }
}
