//! Rename detection (§4.6): correlates `unlink(a) + add(b)` pairs inside a
//! batch into a `rename(a, b)` event when both occur within a time window
//! (default 1000 ms) and `b`'s content hash matches `a`'s last known hash.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devac_core::content_hash;

use crate::watcher::{ChangeKind, WatchEvent};

const DEFAULT_RENAME_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct CategorizedEvents {
    pub adds: Vec<PathBuf>,
    pub changes: Vec<PathBuf>,
    pub deletes: Vec<PathBuf>,
    pub renames: Vec<Rename>,
}

/// Caches the last known content hash per watched path, so a later unlink
/// can be correlated against the content a subsequent add actually
/// produced.
#[derive(Debug, Default)]
pub struct RenameDetector {
    last_hash: HashMap<PathBuf, String>,
    window: Duration,
}

impl RenameDetector {
    pub fn new() -> Self {
        Self { last_hash: HashMap::new(), window: DEFAULT_RENAME_WINDOW }
    }

    pub fn with_window(window: Duration) -> Self {
        Self { last_hash: HashMap::new(), window }
    }

    pub fn record_hash(&mut self, path: &Path, content: &[u8]) {
        self.last_hash.insert(path.to_path_buf(), content_hash(content));
    }

    pub fn forget(&mut self, path: &Path) {
        self.last_hash.remove(path);
    }

    /// No pending correlation state to flush — present for contract
    /// symmetry with [`crate::watcher::FileWatcher::stop`].
    pub fn stop(&mut self) {}

    /// `within_window` is a hook the caller supplies: whether an `unlink`
    /// and `add` pair both fell inside this detector's rename window
    /// (arrival order is already enforced by the watcher batching events
    /// in occurrence order; the caller times the two sides of the pair).
    /// `read_content` is a hook to read the new file's bytes once, so the
    /// correlation does not depend on the event payload carrying them.
    pub fn categorize(
        &mut self,
        events: &[WatchEvent],
        read_content: impl Fn(&Path) -> Option<Vec<u8>>,
    ) -> CategorizedEvents {
        let mut out = CategorizedEvents::default();
        let window_ms = self.window.as_millis() as i64;

        let removed: Vec<(PathBuf, i64)> = events
            .iter()
            .filter(|e| e.kind == ChangeKind::Removed)
            .map(|e| (e.path.clone(), e.timestamp_ms))
            .collect();
        let added_events: Vec<(PathBuf, i64)> = events
            .iter()
            .filter(|e| e.kind == ChangeKind::Created)
            .map(|e| (e.path.clone(), e.timestamp_ms))
            .collect();
        let mut added: Vec<PathBuf> = added_events.iter().map(|(path, _)| path.clone()).collect();

        let mut matched_removed = Vec::new();
        for (old_path, old_ts) in &removed {
            let Some(old_hash) = self.last_hash.get(old_path).cloned() else {
                continue;
            };
            let candidate = added.iter().position(|new_path| {
                let within_window = added_events
                    .iter()
                    .find(|(path, _)| path == new_path)
                    .map(|(_, new_ts)| (new_ts - old_ts).abs() <= window_ms)
                    .unwrap_or(false);
                within_window
                    && read_content(new_path).map(|bytes| content_hash(&bytes) == old_hash).unwrap_or(false)
            });
            if let Some(idx) = candidate {
                let new_path = added.remove(idx);
                self.last_hash.remove(old_path);
                if let Some(bytes) = read_content(&new_path) {
                    self.record_hash(&new_path, &bytes);
                }
                out.renames.push(Rename { old_path: old_path.clone(), new_path });
                matched_removed.push(old_path.clone());
            }
        }

        for (path, _) in &removed {
            if !matched_removed.contains(path) {
                self.last_hash.remove(path);
                out.deletes.push(path.clone());
            }
        }
        out.adds = added;

        for event in events {
            if event.kind == ChangeKind::Modified {
                out.changes.push(event.path.clone());
            }
        }

        out
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlates_unlink_and_add_with_matching_hash_into_rename() {
        let mut detector = RenameDetector::new();
        let old = PathBuf::from("src/utils.ts");
        let new = PathBuf::from("src/util2.ts");
        detector.record_hash(&old, b"export const helper = () => 1;");

        let events = vec![
            WatchEvent { path: old.clone(), kind: ChangeKind::Removed, timestamp_ms: 0 },
            WatchEvent { path: new.clone(), kind: ChangeKind::Created, timestamp_ms: 50 },
        ];

        let result = detector.categorize(&events, |p| {
            if p == new {
                Some(b"export const helper = () => 1;".to_vec())
            } else {
                None
            }
        });

        assert_eq!(result.renames, vec![Rename { old_path: old, new_path: new }]);
        assert!(result.adds.is_empty());
        assert!(result.deletes.is_empty());
    }

    #[test]
    fn unlink_with_no_content_match_is_a_plain_delete() {
        let mut detector = RenameDetector::new();
        let old = PathBuf::from("src/utils.ts");
        detector.record_hash(&old, b"old content");

        let events = vec![
            WatchEvent { path: old.clone(), kind: ChangeKind::Removed, timestamp_ms: 0 },
            WatchEvent { path: PathBuf::from("src/other.ts"), kind: ChangeKind::Created, timestamp_ms: 50 },
        ];

        let result = detector.categorize(&events, |_| Some(b"different content".to_vec()));

        assert!(result.renames.is_empty());
        assert_eq!(result.deletes, vec![old]);
        assert_eq!(result.adds, vec![PathBuf::from("src/other.ts")]);
    }

    #[test]
    fn matching_hash_outside_window_is_left_as_a_plain_delete_and_add() {
        let mut detector = RenameDetector::with_window(Duration::from_millis(1000));
        let old = PathBuf::from("src/utils.ts");
        let new = PathBuf::from("src/util2.ts");
        detector.record_hash(&old, b"export const helper = () => 1;");

        let events = vec![
            WatchEvent { path: old.clone(), kind: ChangeKind::Removed, timestamp_ms: 0 },
            WatchEvent { path: new.clone(), kind: ChangeKind::Created, timestamp_ms: 5_000 },
        ];

        let result = detector.categorize(&events, |p| {
            if p == new {
                Some(b"export const helper = () => 1;".to_vec())
            } else {
                None
            }
        });

        assert!(result.renames.is_empty());
        assert_eq!(result.deletes, vec![old]);
        assert_eq!(result.adds, vec![new]);
    }
}
