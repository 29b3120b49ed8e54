//! MQTT session and still publishing.
//!
//! One long-lived session is opened at startup and shared by every pipeline
//! execution; `MqttPublisher` handles are cheap clones that are safe to use
//! from worker threads. Stills are published fire-and-forget (QoS 0) - the
//! transport's own reconnect handling covers broker hiccups.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use rumqttc::v5::{mqttbytes::QoS, Client, Event, MqttOptions};

use crate::config::MqttSettings;

/// Fixed final topic segment for published stills.
pub const MOTION_SUBTOPIC: &str = "motion";

const CLIENT_ID: &str = "snapshotd";

/// Append `sep` to `value` unless it already ends with it. Idempotent.
pub fn append_separator(value: &str, sep: &str) -> String {
    if value.ends_with(sep) {
        value.to_string()
    } else {
        format!("{value}{sep}")
    }
}

/// Build `<prefix>/<region>/motion` with separators de-duplicated.
pub fn motion_topic(prefix: &str, region: &str) -> String {
    let base = format!("{}{}", append_separator(prefix, "/"), region);
    format!("{}{}", append_separator(&base, "/"), MOTION_SUBTOPIC)
}

/// Publishes a byte buffer on a topic over an established session.
pub trait Publish: Send + Sync {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

/// Owns the broker session and the thread driving its event loop.
pub struct MqttRuntime {
    client: Client,
    stop: Arc<AtomicBool>,
    connection_handle: Option<thread::JoinHandle<()>>,
}

impl MqttRuntime {
    pub fn connect(settings: &MqttSettings) -> Result<Self> {
        let mut options = MqttOptions::new(CLIENT_ID, &settings.host, settings.port);
        options.set_keep_alive(Duration::from_secs(60));
        options.set_clean_start(true);
        if let Some((user, password)) = &settings.credentials {
            options.set_credentials(user, password);
        }

        let (client, mut connection) = Client::new(options, 10);
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                for event in connection.iter() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    match event {
                        Ok(Event::Incoming(_)) | Ok(Event::Outgoing(_)) => {}
                        Err(e) => {
                            log::warn!("mqtt connection error: {}", e);
                            thread::sleep(Duration::from_secs(1));
                        }
                    }
                }
            })
        };

        log::info!(
            "mqtt session to {}:{} (auth: {})",
            settings.host,
            settings.port,
            settings.credentials.is_some()
        );
        Ok(Self {
            client,
            stop,
            connection_handle: Some(handle),
        })
    }

    /// Publisher handle backed by this session.
    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher {
            client: self.client.clone(),
        }
    }

    pub fn disconnect(mut self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        self.client.disconnect()?;
        if let Some(handle) = self.connection_handle.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

/// Thread-safe publisher handle for pipeline executions.
#[derive(Clone)]
pub struct MqttPublisher {
    client: Client,
}

impl Publish for MqttPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client.publish(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }
}
