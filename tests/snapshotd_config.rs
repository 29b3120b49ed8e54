use std::sync::Mutex;

use clap::Parser;
use tempfile::NamedTempFile;

use motion_snapshot::config::{Args, Settings};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SNAPSHOT_WATCH_DIR",
        "SNAPSHOT_MQTT_HOST",
        "SNAPSHOT_MQTT_PORT",
        "SNAPSHOT_MQTT_USER",
        "SNAPSHOT_MQTT_PASSWORD",
        "SNAPSHOT_MQTT_TOPIC",
        "SNAPSHOT_FFMPEG_PATH",
        "SNAPSHOT_FFPROBE_PATH",
        "SNAPSHOT_CONFIG",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_with_flag_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "watch_dir": "/var/lib/cams/clips",
        "mqtt": {
            "host": "broker.lan",
            "port": 8883,
            "user": "cam",
            "password": "hunter2"
        },
        "resize": {
            "width": 640,
            "height": 360
        },
        "topic_prefix": "/cams",
        "region_marker": "my region in ",
        "tools": {
            "ffmpeg": "/opt/ffmpeg/bin/ffmpeg",
            "ffprobe": "/opt/ffmpeg/bin/ffprobe"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    let config_path = file.path().display().to_string();
    let args = Args::parse_from([
        "snapshotd",
        "--config",
        config_path.as_str(),
        "--mqtt-host",
        "override.lan",
    ]);
    let settings = Settings::load(args).expect("load config");

    // The flag wins over the file; everything else comes from the file.
    assert_eq!(settings.mqtt.host, "override.lan");
    assert_eq!(settings.mqtt.port, 8883);
    assert_eq!(
        settings.mqtt.credentials,
        Some(("cam".to_string(), "hunter2".to_string()))
    );
    assert_eq!(settings.watch_dir.display().to_string(), "/var/lib/cams/clips");
    assert_eq!(settings.resize.width, 640);
    assert_eq!(settings.resize.height, 360);
    assert_eq!(settings.topic_prefix, "/cams/");
    assert_eq!(settings.tools.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
    assert_eq!(settings.tools.ffprobe, "/opt/ffmpeg/bin/ffprobe");
}

#[test]
fn env_supplies_values_when_flags_are_absent() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SNAPSHOT_WATCH_DIR", "/clips");
    std::env::set_var("SNAPSHOT_MQTT_HOST", "broker.lan");
    std::env::set_var("SNAPSHOT_MQTT_TOPIC", "/home/cams");

    let args = Args::parse_from(["snapshotd"]);
    let settings = Settings::load(args).expect("load config");
    clear_env();

    assert_eq!(settings.watch_dir.display().to_string(), "/clips");
    assert_eq!(settings.mqtt.host, "broker.lan");
    assert_eq!(settings.topic_prefix, "/home/cams/");
}

#[test]
fn missing_required_values_fail_startup() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let args = Args::parse_from(["snapshotd", "--mqtt-host", "broker.lan"]);
    assert!(Settings::load(args).is_err());

    let args = Args::parse_from(["snapshotd", "--watch-dir", "/clips"]);
    assert!(Settings::load(args).is_err());
}

#[test]
fn invalid_config_file_is_a_startup_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"not json").expect("write config");

    let config_path = file.path().display().to_string();
    let args = Args::parse_from([
        "snapshotd",
        "--watch-dir",
        "/clips",
        "--mqtt-host",
        "broker.lan",
        "--config",
        config_path.as_str(),
    ]);
    let err = Settings::load(args).unwrap_err();
    assert!(err.to_string().contains("invalid config file"));
}
