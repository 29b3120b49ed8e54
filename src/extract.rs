//! Midpoint still extraction via the external ffmpeg tools.
//!
//! `FfmpegExtractor` probes the clip duration with `ffprobe`, seeks to the
//! midpoint and asks `ffmpeg` to write exactly one still image to a
//! caller-chosen destination. Tool locations are overridable so deployments
//! with bundled binaries can point at them.

use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use thiserror::Error;

/// Extraction instant, as a percentage of the clip duration.
const STILL_POSITION_PERCENT: f64 = 50.0;

/// Locations of the external decode tools.
#[derive(Clone, Debug)]
pub struct ToolPaths {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed ({status}): {stderr}")]
    Tool {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("unreadable clip duration {raw:?}")]
    Duration { raw: String },
}

/// Writes exactly one still image for a source clip to a caller-chosen path.
///
/// The external tools sit behind this trait so pipeline behavior can be
/// exercised with a stub extractor.
pub trait StillExtractor: Send + Sync {
    fn extract_still(&self, source: &Path, dest: &Path) -> Result<(), ExtractError>;
}

pub struct FfmpegExtractor {
    tools: ToolPaths,
}

impl FfmpegExtractor {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }

    /// Verify both external tools are invocable; returns the encoder's
    /// version line for the startup log.
    pub fn check_available(&self) -> Result<String> {
        let version = run_version(&self.tools.ffmpeg)?;
        run_version(&self.tools.ffprobe)?;
        Ok(version)
    }

    fn probe_duration(&self, source: &Path) -> Result<f64, ExtractError> {
        let output = Command::new(&self.tools.ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(source)
            .output()
            .map_err(|e| ExtractError::Launch {
                tool: self.tools.ffprobe.clone(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(ExtractError::Tool {
                tool: self.tools.ffprobe.clone(),
                status: output.status,
                stderr: stderr_tail(&output.stderr),
            });
        }
        let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
        parse_duration(&raw).ok_or(ExtractError::Duration { raw })
    }
}

impl StillExtractor for FfmpegExtractor {
    fn extract_still(&self, source: &Path, dest: &Path) -> Result<(), ExtractError> {
        let duration = self.probe_duration(source)?;
        let seek = duration * (STILL_POSITION_PERCENT / 100.0);
        let output = Command::new(&self.tools.ffmpeg)
            .arg("-v")
            .arg("error")
            .arg("-y")
            .arg("-ss")
            .arg(format!("{seek:.3}"))
            .arg("-i")
            .arg(source)
            .arg("-frames:v")
            .arg("1")
            .arg(dest)
            .output()
            .map_err(|e| ExtractError::Launch {
                tool: self.tools.ffmpeg.clone(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(ExtractError::Tool {
                tool: self.tools.ffmpeg.clone(),
                status: output.status,
                stderr: stderr_tail(&output.stderr),
            });
        }
        Ok(())
    }
}

fn run_version(tool: &str) -> Result<String> {
    let output = Command::new(tool)
        .arg("-version")
        .output()
        .with_context(|| format!("{tool} not found in PATH"))?;
    if !output.status.success() {
        return Err(anyhow!("{} -version failed with {}", tool, output.status));
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or("unknown")
        .to_string())
}

fn parse_duration(raw: &str) -> Option<f64> {
    let value: f64 = raw.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr).trim().to_string()
}
