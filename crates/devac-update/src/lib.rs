//! Incremental update pipeline (§4.5): the path a single watcher event
//! takes from raw bytes on disk to a merged, re-resolved seed set.

pub mod manager;

pub use manager::{
    BatchResult, ChangeType, FileChangeEvent, RenameEvent, UpdateManager, UpdateResult,
};
