//! Debounced filesystem event source (§4.6).
//!
//! Raw `notify` events are coalesced by `notify-debouncer-full` within a
//! window (default 100 ms); events for the same path inside one window
//! collapse to the most recent type. Initial-file emission — one synthetic
//! `Created` per already-present file when watching starts — is off by
//! default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp_ms: i64,
}

pub struct WatchOptions {
    pub debounce: Duration,
    pub emit_initial: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { debounce: DEFAULT_DEBOUNCE, emit_initial: false }
    }
}

/// Owns the `notify` debouncer and the channel batches of coalesced events
/// arrive on. Dropping it (or calling [`FileWatcher::stop`]) tears down the
/// underlying OS watch.
pub struct FileWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher, FileIdMap>,
    batch_rx: mpsc::UnboundedReceiver<Vec<WatchEvent>>,
    pending_live: Option<mpsc::UnboundedReceiver<Vec<WatchEvent>>>,
    drained: std::collections::VecDeque<Vec<WatchEvent>>,
    stopped: bool,
}

impl FileWatcher {
    pub fn new(root: impl AsRef<Path>, options: WatchOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (batch_tx, batch_rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(options.debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let now_ms = chrono::Utc::now().timestamp_millis();
                    let batch: Vec<WatchEvent> = events
                        .into_iter()
                        .filter(|e| !should_ignore_path(e.paths.first().map(PathBuf::as_path).unwrap_or(Path::new(""))))
                        .filter_map(|e| classify(&e.event).map(|kind| (e, kind)))
                        .flat_map(|(e, kind)| {
                            e.paths.into_iter().map(move |path| WatchEvent { path, kind, timestamp_ms: now_ms })
                        })
                        .collect();
                    if !batch.is_empty() {
                        if let Err(err) = batch_tx.send(batch) {
                            warn!("watch batch receiver dropped: {err}");
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        warn!("filesystem watch error: {error}");
                    }
                }
            }
        })?;

        debouncer.watch(&root, RecursiveMode::Recursive)?;

        let mut watcher = Self {
            _debouncer: debouncer,
            batch_rx,
            pending_live: None,
            drained: std::collections::VecDeque::new(),
            stopped: false,
        };

        if options.emit_initial {
            let now_ms = chrono::Utc::now().timestamp_millis();
            let initial: Vec<WatchEvent> = ignore::WalkBuilder::new(&root)
                .build()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
                .map(|entry| WatchEvent { path: entry.into_path(), kind: ChangeKind::Created, timestamp_ms: now_ms })
                .collect();
            if !initial.is_empty() {
                debug!(count = initial.len(), "emitting initial file set");
                let (initial_tx, initial_rx) = mpsc::unbounded_channel();
                let _ = initial_tx.send(initial);
                drop(initial_tx);
                let live_rx = std::mem::replace(&mut watcher.batch_rx, initial_rx);
                watcher.pending_live = Some(live_rx);
            }
        }

        Ok(watcher)
    }

    /// Await the next coalesced batch. Returns `None` once [`Self::stop`]
    /// has drained all pending timers and the final batch has been
    /// delivered.
    pub async fn next_batch(&mut self) -> Option<Vec<WatchEvent>> {
        if let Some(batch) = self.drained.pop_front() {
            return Some(batch);
        }
        if self.stopped {
            return None;
        }
        loop {
            match self.batch_rx.recv().await {
                Some(batch) => return Some(batch),
                None => match self.pending_live.take() {
                    Some(live) => self.batch_rx = live,
                    None => return None,
                },
            }
        }
    }

    /// Stop watching. Any batch already sitting in the channel (including
    /// one from a debounce timer that fired just before this call) is
    /// drained into a buffer first, so a subsequent `next_batch` call still
    /// delivers it before returning `None`.
    pub fn stop(&mut self) {
        while let Ok(batch) = self.batch_rx.try_recv() {
            self.drained.push_back(batch);
        }
        self.batch_rx.close();
        self.stopped = true;
    }
}

fn classify(event: &notify::Event) -> Option<ChangeKind> {
    match event.kind {
        notify::EventKind::Create(_) => Some(ChangeKind::Created),
        notify::EventKind::Modify(_) => Some(ChangeKind::Modified),
        notify::EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

fn should_ignore_path(path: &Path) -> bool {
    path.components().any(|c| matches!(
        c.as_os_str().to_str(),
        Some("target") | Some(".git") | Some("node_modules") | Some(".devac")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_known_noise_directories() {
        assert!(should_ignore_path(Path::new("proj/target/debug/build.rs")));
        assert!(should_ignore_path(Path::new("proj/.git/HEAD")));
        assert!(should_ignore_path(Path::new("proj/.devac/seed/meta.json")));
        assert!(!should_ignore_path(Path::new("proj/src/lib.rs")));
    }

    #[test]
    fn default_options_use_100ms_debounce_and_no_initial_emission() {
        let opts = WatchOptions::default();
        assert_eq!(opts.debounce, Duration::from_millis(100));
        assert!(!opts.emit_initial);
    }
}
