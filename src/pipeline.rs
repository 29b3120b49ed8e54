//! Per-clip snapshot pipeline.
//!
//! Each watched clip drives one independent execution:
//! match region -> allocate temp still -> extract -> read + delete ->
//! transcode -> publish. The execution exclusively owns its temporary still
//! and removes it before finishing, on success and failure paths alike.
//! Failures are scoped to the execution that hit them; the daemon keeps
//! watching.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::extract::StillExtractor;
use crate::matcher::RegionMatcher;
use crate::publish::{motion_topic, Publish};
use crate::transcode::Transcoder;

/// Failure of a single pipeline execution, tagged by the stage that hit it.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("no region in clip name {path}")]
    Match { path: String },
    #[error("failed to allocate temp still path: {source}")]
    Allocation {
        #[source]
        source: std::io::Error,
    },
    #[error("frame extraction failed for {path}: {detail}")]
    Extraction { path: String, detail: String },
    #[error("failed to read still {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transcode failed for {path}: {detail}")]
    Transcode { path: String, detail: String },
    #[error("publish to {topic} failed: {detail}")]
    Publish { topic: String, detail: String },
    #[error("shutdown requested")]
    Cancelled,
}

impl StageError {
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::Match { .. } => "match",
            StageError::Allocation { .. } => "alloc",
            StageError::Extraction { .. } => "extract",
            StageError::Read { .. } => "read",
            StageError::Transcode { .. } => "transcode",
            StageError::Publish { .. } => "publish",
            StageError::Cancelled => "cancelled",
        }
    }
}

/// Wires matcher, extractor, transcoder and publisher into one execution
/// per clip. Shared across worker threads behind an `Arc`.
pub struct Pipeline {
    matcher: Box<dyn RegionMatcher>,
    extractor: Box<dyn StillExtractor>,
    transcoder: Transcoder,
    publisher: Box<dyn Publish>,
    topic_prefix: String,
    shutdown: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        matcher: Box<dyn RegionMatcher>,
        extractor: Box<dyn StillExtractor>,
        transcoder: Transcoder,
        publisher: Box<dyn Publish>,
        topic_prefix: impl Into<String>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            matcher,
            extractor,
            transcoder,
            publisher,
            topic_prefix: topic_prefix.into(),
            shutdown,
        }
    }

    /// Run one execution for a newly added clip.
    pub fn process(&self, path: &Path) -> Result<(), StageError> {
        let clip = path.display().to_string();

        self.checkpoint()?;
        let region = self
            .matcher
            .region(&path.to_string_lossy())
            .map_err(|_| StageError::Match { path: clip.clone() })?;
        log::debug!("clip {} matched region {}", clip, region);

        self.checkpoint()?;
        let still = tempfile::Builder::new()
            .prefix("snapshot-")
            .suffix(".png")
            .tempfile()
            .map_err(|source| StageError::Allocation { source })?
            .into_temp_path();
        log::debug!("extracting midpoint still of {} into {}", clip, still.display());

        self.checkpoint()?;
        // On error the TempPath drops here and the allocated file is removed.
        self.extractor
            .extract_still(path, &still)
            .map_err(|e| StageError::Extraction {
                path: clip.clone(),
                detail: e.to_string(),
            })?;

        self.checkpoint()?;
        // Delete the still right after the read attempt, whatever its outcome.
        let read = std::fs::read(&still);
        if let Err(e) = still.close() {
            log::warn!("failed to remove still for {}: {}", clip, e);
        }
        let frame = read.map_err(|source| StageError::Read {
            path: clip.clone(),
            source,
        })?;
        log::debug!("read {} byte still for {}", frame.len(), clip);

        self.checkpoint()?;
        let jpeg = self
            .transcoder
            .transcode(&frame)
            .map_err(|e| StageError::Transcode {
                path: clip.clone(),
                detail: e.to_string(),
            })?;

        self.checkpoint()?;
        let topic = motion_topic(&self.topic_prefix, &region);
        let payload_len = jpeg.len();
        self.publisher
            .publish(&topic, jpeg)
            .map_err(|e| StageError::Publish {
                topic: topic.clone(),
                detail: e.to_string(),
            })?;
        log::info!("published {} byte still of {} to {}", payload_len, clip, topic);
        Ok(())
    }

    fn checkpoint(&self) -> Result<(), StageError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(StageError::Cancelled);
        }
        Ok(())
    }
}
