//! Region derivation from clip file names.
//!
//! Camera uploads carry the recording region embedded in the file name after
//! a literal marker, e.g. `clip_my region in Garage_01.mp4`. The matcher
//! captures the alphanumeric token following the marker and lower-cases it
//! for use as a topic-path segment.

use anyhow::{anyhow, Result};
use regex::Regex;
use thiserror::Error;

/// Topic-path segment derived from a clip file name.
pub type Region = String;

/// The observed path does not carry a region marker.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("file name carries no region marker")]
pub struct MatchError;

/// Derives a publish-topic region from an observed file path.
///
/// The naming convention sits behind this trait so it can be swapped without
/// touching the pipeline.
pub trait RegionMatcher: Send + Sync {
    fn region(&self, path: &str) -> std::result::Result<Region, MatchError>;
}

/// Matches a configurable literal marker followed by an alphanumeric token.
pub struct MarkerMatcher {
    pattern: Regex,
}

impl MarkerMatcher {
    pub fn new(marker: &str) -> Result<Self> {
        if marker.trim().is_empty() {
            return Err(anyhow!("region marker must not be empty"));
        }
        let pattern = Regex::new(&format!("{}([A-Za-z0-9]+)", regex::escape(marker)))?;
        Ok(Self { pattern })
    }
}

impl RegionMatcher for MarkerMatcher {
    fn region(&self, path: &str) -> std::result::Result<Region, MatchError> {
        let capture = self
            .pattern
            .captures(path)
            .and_then(|captures| captures.get(1))
            .ok_or(MatchError)?;
        Ok(capture.as_str().to_lowercase())
    }
}
