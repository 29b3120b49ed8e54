//! Clip directory watcher.
//!
//! Wraps a recursive `notify` watcher and debounces raw events so a clip is
//! only reported once its writes have settled. Dot-files anywhere in the
//! path are ignored.

use anyhow::Result;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Watches a directory tree and reports newly added clip files.
pub struct ClipWatcher {
    watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Result<Event, notify::Error>>,
    /// Added paths waiting for their debounce window to elapse.
    pending: HashMap<PathBuf, Instant>,
    debounce: Duration,
}

impl ClipWatcher {
    pub fn new() -> Result<Self> {
        Self::with_debounce(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    pub fn with_debounce(debounce: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(tx)?;
        Ok(Self {
            watcher,
            rx,
            pending: HashMap::new(),
            debounce,
        })
    }

    pub fn watch(&mut self, path: &Path) -> Result<()> {
        self.watcher.watch(path, RecursiveMode::Recursive)?;
        Ok(())
    }

    /// Poll for clips whose create events have settled past the debounce
    /// window. Each added clip is reported exactly once.
    pub fn poll_added(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        while let Ok(result) = self.rx.try_recv() {
            if let Ok(event) = result {
                self.process_raw_event(event, now);
            }
        }

        let mut ready = Vec::new();
        let mut still_pending = HashMap::new();
        for (path, last_seen) in self.pending.drain() {
            if now.duration_since(last_seen) >= self.debounce {
                ready.push(path);
            } else {
                still_pending.insert(path, last_seen);
            }
        }
        self.pending = still_pending;
        ready
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn process_raw_event(&mut self, event: Event, now: Instant) {
        use notify::EventKind;

        match event.kind {
            EventKind::Create(_) => {
                for path in event.paths {
                    if is_clip_candidate(&path) {
                        self.pending.insert(path, now);
                    }
                }
            }
            EventKind::Modify(_) => {
                // A pending clip is still being written; hold it back.
                for path in event.paths {
                    if let Some(last_seen) = self.pending.get_mut(&path) {
                        *last_seen = now;
                    }
                }
            }
            EventKind::Remove(_) => {
                for path in event.paths {
                    self.pending.remove(&path);
                }
            }
            _ => {}
        }
    }
}

/// Directories and dot-files are not snapshot candidates.
fn is_clip_candidate(path: &Path) -> bool {
    if path.is_dir() {
        return false;
    }
    for component in path.components() {
        if let Component::Normal(name) = component {
            if name.to_string_lossy().starts_with('.') {
                return false;
            }
        }
    }
    true
}
