//! Motion snapshot daemon.
//!
//! This crate implements `snapshotd`, which:
//!
//! 1. Watches a clip directory for newly recorded camera footage
//! 2. Derives a region (topic segment) from each clip's file name
//! 3. Extracts a midpoint still frame with the external ffmpeg tools
//! 4. Resizes and re-encodes the still to JPEG in memory
//! 5. Publishes the image over MQTT under `<prefix>/<region>/motion`
//!
//! # Module Structure
//!
//! - `watch`: debounced directory watcher emitting clip-added events
//! - `matcher`: region derivation from clip file names
//! - `extract`: external ffmpeg/ffprobe still extraction
//! - `transcode`: in-memory resize + JPEG re-encode
//! - `publish`: MQTT session, publisher handle, topic construction
//! - `pipeline`: the per-clip execution tying the stages together
//!
//! Every failure past startup is scoped to the single clip that hit it;
//! only configuration errors terminate the process.

pub mod config;
pub mod extract;
pub mod matcher;
pub mod pipeline;
pub mod publish;
pub mod transcode;
pub mod watch;

pub use config::{Args, MqttSettings, ResizeSettings, Settings};
pub use extract::{ExtractError, FfmpegExtractor, StillExtractor, ToolPaths};
pub use matcher::{MarkerMatcher, MatchError, Region, RegionMatcher};
pub use pipeline::{Pipeline, StageError};
pub use publish::{
    append_separator, motion_topic, MqttPublisher, MqttRuntime, Publish, MOTION_SUBTOPIC,
};
pub use transcode::{TranscodeError, Transcoder};
pub use watch::ClipWatcher;
