//! Debounced file watching and rename detection feeding the update manager
//! (§4.6).

pub mod rename;
pub mod watcher;

pub use rename::{CategorizedEvents, Rename, RenameDetector};
pub use watcher::{ChangeKind, FileWatcher, WatchEvent, WatchOptions};
