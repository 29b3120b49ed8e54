//! snapshotd - camera clip snapshot daemon
//!
//! This daemon:
//! 1. Watches a clip directory for newly recorded camera footage
//! 2. Spawns one independent pipeline execution per added clip
//! 3. Extracts a midpoint still with the external ffmpeg tools
//! 4. Resizes/re-encodes the still and publishes it over MQTT under
//!    `<prefix>/<region>/motion`
//!
//! Configuration errors terminate the process; everything after startup is
//! scoped to the single clip that failed.

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use motion_snapshot::{
    Args, ClipWatcher, FfmpegExtractor, MarkerMatcher, MqttRuntime, Pipeline, Settings,
    Transcoder, MOTION_SUBTOPIC,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::load(args)?;

    let extractor = FfmpegExtractor::new(settings.tools.clone());
    let version = extractor.check_available()?;
    log::info!("using {}", version);

    let runtime = MqttRuntime::connect(&settings.mqtt)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))?;
    }

    let matcher = MarkerMatcher::new(&settings.region_marker)?;
    let transcoder = Transcoder::new(settings.resize.width, settings.resize.height)?;
    let pipeline = Arc::new(Pipeline::new(
        Box::new(matcher),
        Box::new(extractor),
        transcoder,
        Box::new(runtime.publisher()),
        settings.topic_prefix.clone(),
        Arc::clone(&shutdown),
    ));

    let mut watcher = ClipWatcher::new()?;
    watcher.watch(&settings.watch_dir)?;
    log::info!(
        "snapshotd watching {} ({}x{} stills to {}<region>/{})",
        settings.watch_dir.display(),
        settings.resize.width,
        settings.resize.height,
        settings.topic_prefix,
        MOTION_SUBTOPIC
    );

    let mut workers: Vec<thread::JoinHandle<()>> = Vec::new();
    while !shutdown.load(Ordering::SeqCst) {
        for path in watcher.poll_added() {
            log::info!("clip added {}", path.display());
            let pipeline = Arc::clone(&pipeline);
            workers.push(thread::spawn(move || {
                if let Err(e) = pipeline.process(&path) {
                    log::warn!("pipeline stage={} clip={}: {}", e.stage(), path.display(), e);
                }
            }));
        }
        workers.retain(|worker| !worker.is_finished());
        thread::sleep(POLL_INTERVAL);
    }

    log::info!("shutting down ({} executions in flight)", workers.len());
    for worker in workers {
        let _ = worker.join();
    }
    runtime.disconnect()?;
    Ok(())
}
