//! snapshotd configuration.
//!
//! Settings are layered: an optional JSON config file supplies defaults,
//! command-line flags and their environment fallbacks win over the file.
//! Validation happens once at startup; a bad configuration is the only
//! process-fatal condition in the daemon.

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::ToolPaths;
use crate::publish::append_separator;

pub const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_RESIZE_WIDTH: u32 = 320;
const DEFAULT_RESIZE_HEIGHT: u32 = 200;
const DEFAULT_TOPIC_PREFIX: &str = "/security/camera/";
const DEFAULT_PUBLISH_INTERVAL_MS: u64 = 10_000;
const DEFAULT_REGION_MARKER: &str = "my region in ";

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Publish camera clip stills to MQTT")]
pub struct Args {
    /// Directory watched recursively for new clips.
    #[arg(long, env = "SNAPSHOT_WATCH_DIR")]
    pub watch_dir: Option<PathBuf>,

    /// MQTT broker host.
    #[arg(long, env = "SNAPSHOT_MQTT_HOST")]
    pub mqtt_host: Option<String>,

    /// MQTT broker port.
    #[arg(long, env = "SNAPSHOT_MQTT_PORT")]
    pub mqtt_port: Option<u16>,

    /// MQTT username; requires --mqtt-password.
    #[arg(long, env = "SNAPSHOT_MQTT_USER")]
    pub mqtt_user: Option<String>,

    /// MQTT password; requires --mqtt-user.
    #[arg(long, env = "SNAPSHOT_MQTT_PASSWORD")]
    pub mqtt_password: Option<String>,

    /// Width of the published still, in pixels.
    #[arg(long)]
    pub resize_width: Option<u32>,

    /// Height of the published still, in pixels.
    #[arg(long)]
    pub resize_height: Option<u32>,

    /// Base topic path; a single trailing separator is enforced.
    #[arg(long, env = "SNAPSHOT_MQTT_TOPIC")]
    pub mqtt_topic: Option<String>,

    /// Reserved; not consumed by the pipeline.
    #[arg(long)]
    pub publish_interval: Option<u64>,

    /// Literal marker preceding the region token in clip names.
    #[arg(long)]
    pub region_marker: Option<String>,

    /// Override for the ffmpeg binary location.
    #[arg(long, env = "SNAPSHOT_FFMPEG_PATH")]
    pub ffmpeg_path: Option<String>,

    /// Override for the ffprobe binary location.
    #[arg(long, env = "SNAPSHOT_FFPROBE_PATH")]
    pub ffprobe_path: Option<String>,

    /// JSON config file supplying any of the above; flags and env win.
    #[arg(long, env = "SNAPSHOT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct SnapshotConfigFile {
    watch_dir: Option<PathBuf>,
    mqtt: Option<MqttConfigFile>,
    resize: Option<ResizeConfigFile>,
    topic_prefix: Option<String>,
    publish_interval_ms: Option<u64>,
    region_marker: Option<String>,
    tools: Option<ToolConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct MqttConfigFile {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ResizeConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ToolConfigFile {
    ffmpeg: Option<String>,
    ffprobe: Option<String>,
}

/// Validated daemon settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub watch_dir: PathBuf,
    pub mqtt: MqttSettings,
    pub resize: ResizeSettings,
    /// Normalized to end with exactly one separator.
    pub topic_prefix: String,
    /// Reserved for future use.
    pub publish_interval: Duration,
    pub region_marker: String,
    pub tools: ToolPaths,
}

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
}

#[derive(Debug, Clone, Copy)]
pub struct ResizeSettings {
    pub width: u32,
    pub height: u32,
}

impl Settings {
    pub fn load(args: Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => read_config_file(path)?,
            None => SnapshotConfigFile::default(),
        };

        let watch_dir = args
            .watch_dir
            .or(file.watch_dir)
            .ok_or_else(|| anyhow!("no watch directory configured (--watch-dir)"))?;

        let file_mqtt = file.mqtt.unwrap_or_default();
        let host = args
            .mqtt_host
            .or(file_mqtt.host)
            .ok_or_else(|| anyhow!("no mqtt broker host configured (--mqtt-host)"))?;
        let port = args.mqtt_port.or(file_mqtt.port).unwrap_or(DEFAULT_MQTT_PORT);
        let credentials = match (
            args.mqtt_user.or(file_mqtt.user),
            args.mqtt_password.or(file_mqtt.password),
        ) {
            (Some(user), Some(password)) => Some((user, password)),
            (None, None) => None,
            _ => return Err(anyhow!("mqtt user and password must be set together")),
        };

        let file_resize = file.resize.unwrap_or_default();
        let width = args
            .resize_width
            .or(file_resize.width)
            .unwrap_or(DEFAULT_RESIZE_WIDTH);
        let height = args
            .resize_height
            .or(file_resize.height)
            .unwrap_or(DEFAULT_RESIZE_HEIGHT);
        if width == 0 || height == 0 {
            return Err(anyhow!("resize dimensions must be positive"));
        }

        let topic_prefix = append_separator(
            &args
                .mqtt_topic
                .or(file.topic_prefix)
                .unwrap_or_else(|| DEFAULT_TOPIC_PREFIX.to_string()),
            "/",
        );

        let publish_interval = Duration::from_millis(
            args.publish_interval
                .or(file.publish_interval_ms)
                .unwrap_or(DEFAULT_PUBLISH_INTERVAL_MS),
        );

        let region_marker = args
            .region_marker
            .or(file.region_marker)
            .unwrap_or_else(|| DEFAULT_REGION_MARKER.to_string());
        if region_marker.trim().is_empty() {
            return Err(anyhow!("region marker must not be empty"));
        }

        let file_tools = file.tools.unwrap_or_default();
        let tools = ToolPaths {
            ffmpeg: args
                .ffmpeg_path
                .or(file_tools.ffmpeg)
                .unwrap_or_else(|| ToolPaths::default().ffmpeg),
            ffprobe: args
                .ffprobe_path
                .or(file_tools.ffprobe)
                .unwrap_or_else(|| ToolPaths::default().ffprobe),
        };

        Ok(Self {
            watch_dir,
            mqtt: MqttSettings {
                host,
                port,
                credentials,
            },
            resize: ResizeSettings { width, height },
            topic_prefix,
            publish_interval,
            region_marker,
            tools,
        })
    }
}

fn read_config_file(path: &Path) -> Result<SnapshotConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_args() -> Args {
        Args {
            watch_dir: Some(PathBuf::from("/clips")),
            mqtt_host: Some("broker".to_string()),
            ..Args::default()
        }
    }

    #[test]
    fn defaults_fill_unset_options() {
        let settings = Settings::load(minimal_args()).expect("load");
        assert_eq!(settings.mqtt.port, DEFAULT_MQTT_PORT);
        assert_eq!(settings.resize.width, 320);
        assert_eq!(settings.resize.height, 200);
        assert_eq!(settings.topic_prefix, "/security/camera/");
        assert_eq!(settings.publish_interval, Duration::from_millis(10_000));
        assert_eq!(settings.region_marker, "my region in ");
        assert_eq!(settings.tools.ffmpeg, "ffmpeg");
        assert!(settings.mqtt.credentials.is_none());
    }

    #[test]
    fn topic_prefix_gains_exactly_one_trailing_separator() {
        let mut args = minimal_args();
        args.mqtt_topic = Some("/cams".to_string());
        let settings = Settings::load(args).expect("load");
        assert_eq!(settings.topic_prefix, "/cams/");

        let mut args = minimal_args();
        args.mqtt_topic = Some("/cams/".to_string());
        let settings = Settings::load(args).expect("load");
        assert_eq!(settings.topic_prefix, "/cams/");
    }

    #[test]
    fn one_sided_credentials_are_rejected() {
        let mut args = minimal_args();
        args.mqtt_user = Some("cam".to_string());
        let err = Settings::load(args).unwrap_err();
        assert!(err.to_string().contains("together"));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let mut args = minimal_args();
        args.resize_width = Some(0);
        assert!(Settings::load(args).is_err());
    }

    #[test]
    fn missing_watch_dir_is_an_error() {
        let args = Args {
            mqtt_host: Some("broker".to_string()),
            ..Args::default()
        };
        let err = Settings::load(args).unwrap_err();
        assert!(err.to_string().contains("watch directory"));
    }

    #[test]
    fn missing_broker_host_is_an_error() {
        let args = Args {
            watch_dir: Some(PathBuf::from("/clips")),
            ..Args::default()
        };
        let err = Settings::load(args).unwrap_err();
        assert!(err.to_string().contains("broker host"));
    }
}
