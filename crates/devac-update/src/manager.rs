//! Incremental update pipeline (§4.5): the per-file path from a raw
//! watcher event to a merged, re-resolved seed set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{debug, warn};

use devac_core::{content_hash, DevacError, Edge, EdgeKind, EntityId, Node};
use devac_indexer::{ParseConfig, ParseOutput, ParserRegistry};
use devac_resolver::{LocalSymbolIndex, Resolver};
use devac_seed::SeedStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Add,
    Change,
    Unlink,
}

#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    pub change_type: ChangeType,
    pub file_path: PathBuf,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct RenameEvent {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateResult {
    pub success: bool,
    pub skipped: bool,
    pub time_ms: u64,
    pub error: Option<String>,
}

impl UpdateResult {
    fn ok(time_ms: u64) -> Self {
        Self { success: true, skipped: false, time_ms, error: None }
    }

    fn skipped(time_ms: u64) -> Self {
        Self { success: true, skipped: true, time_ms, error: None }
    }

    fn failed(time_ms: u64, error: impl Into<String>) -> Self {
        Self { success: false, skipped: false, time_ms, error: Some(error.into()) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total_time_ms: u64,
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
}

/// Per-file tracked state plus the shared machinery (parser, resolver,
/// seed store) an `UpdateManager` drives one package through.
pub struct UpdateManager {
    package_root: PathBuf,
    registry: Arc<ParserRegistry>,
    resolver: Arc<Resolver>,
    seed: SeedStore,
    config: ParseConfig,
    outputs: DashMap<PathBuf, ParseOutput>,
    disposed: std::sync::atomic::AtomicBool,
}

impl UpdateManager {
    pub fn new(
        package_root: impl Into<PathBuf>,
        branch: impl Into<String>,
        registry: Arc<ParserRegistry>,
        resolver: Arc<Resolver>,
    ) -> Self {
        let package_root = package_root.into();
        let branch = branch.into();
        let seed = SeedStore::open(package_root.clone(), branch.clone());
        let config = ParseConfig { branch, package_path: package_root.to_string_lossy().into_owned(), ..Default::default() };
        Self {
            package_root,
            registry,
            resolver,
            seed,
            config,
            outputs: DashMap::new(),
            disposed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub async fn process_file_change(&self, event: FileChangeEvent) -> UpdateResult {
        let started = Instant::now();

        if event.change_type == ChangeType::Unlink {
            return self.process_unlink(&event.file_path, started);
        }

        let bytes = match std::fs::read(&event.file_path) {
            Ok(bytes) => bytes,
            Err(e) => return UpdateResult::failed(elapsed_ms(started), e.to_string()),
        };
        let new_hash = content_hash(&bytes);
        if let Some(existing) = self.outputs.get(&event.file_path) {
            if existing.source_file_hash == new_hash {
                return UpdateResult::skipped(elapsed_ms(started));
            }
        }

        let parsed = self.registry.parse(&event.file_path, &self.config);
        let output = match parsed {
            Ok(output) => output,
            Err(e) => return UpdateResult::failed(elapsed_ms(started), e.to_string()),
        };

        self.outputs.insert(event.file_path.clone(), output);

        if let Err(e) = self.resolve_and_write(&event.file_path).await {
            return UpdateResult::failed(elapsed_ms(started), e.to_string());
        }

        debug!(file = %event.file_path.display(), "applied incremental update");
        UpdateResult::ok(elapsed_ms(started))
    }

    /// Deleting a file still owes the seed one last write carrying its rows
    /// tombstoned (`is_deleted: true`) rather than silently vanishing them —
    /// readers that already cached the old rows need the tombstone to know
    /// they're gone.
    fn process_unlink(&self, path: &Path, started: Instant) -> UpdateResult {
        let tombstoned = self.outputs.remove(path).map(|(_, output)| output);
        self.resolver.clear_cache(&self.package_root);
        match self.rewrite_seed(tombstoned) {
            Ok(()) => UpdateResult::ok(elapsed_ms(started)),
            Err(e) => UpdateResult::failed(elapsed_ms(started), e.to_string()),
        }
    }

    /// Rename is `unlink(old) + add(new)` under the hood, but emitted to
    /// callers as a single logical result.
    pub async fn process_rename(&self, rename: RenameEvent) -> UpdateResult {
        let started = Instant::now();
        self.outputs.remove(&rename.old_path);

        let add = FileChangeEvent {
            change_type: ChangeType::Add,
            file_path: rename.new_path,
            timestamp: rename.timestamp,
        };
        let mut result = self.process_file_change(add).await;
        result.time_ms = elapsed_ms(started);
        result
    }

    pub async fn process_batch(&self, events: Vec<FileChangeEvent>) -> BatchResult {
        let started = Instant::now();
        let mut result = BatchResult::default();
        for event in events {
            let outcome = self.process_file_change(event).await;
            if outcome.skipped {
                result.skipped_count += 1;
            } else if outcome.success {
                result.success_count += 1;
            } else {
                result.error_count += 1;
            }
        }
        result.total_time_ms = elapsed_ms(started);
        result
    }

    /// Flush pending state. No buffered writes survive past process-level
    /// crashes since every write is already atomic at the table level; this
    /// exists so callers have one place to release the manager's resources.
    pub fn dispose(&self) {
        self.disposed.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    async fn resolve_and_write(&self, touched: &Path) -> anyhow::Result<()> {
        let all_outputs: Vec<ParseOutput> = self.outputs.iter().map(|entry| entry.value().clone()).collect();
        let index = self.resolver.build_export_index_from_outputs(&self.package_root, &all_outputs);

        let mut exported: HashMap<String, EntityId> = HashMap::new();
        for exports in index.file_exports.values() {
            for export in exports {
                exported.entry(export.name.clone()).or_insert_with(|| export.entity_id.clone());
            }
        }

        let all_nodes: Vec<Node> = all_outputs.iter().flat_map(|o| o.nodes.clone()).collect();

        if let Some(mut entry) = self.outputs.get_mut(touched) {
            let local = LocalSymbolIndex::build(&entry.nodes);
            let stub_calls: Vec<Edge> =
                entry.edges.iter().filter(|e| e.edge_type == EdgeKind::Calls).cloned().collect();
            let stub_extends: Vec<Edge> = entry
                .edges
                .iter()
                .filter(|e| matches!(e.edge_type, EdgeKind::Extends | EdgeKind::Implements))
                .cloned()
                .collect();

            let resolved_calls = self.resolver.resolve_call_edges(&stub_calls, &local, &exported);
            let resolved_extends = self.resolver.resolve_extends_edges(&stub_extends, &all_nodes);

            for resolved in resolved_calls.into_iter().chain(resolved_extends) {
                if let Some(slot) = entry.edges.iter_mut().find(|e| {
                    e.edge_type == resolved.edge.edge_type
                        && e.source_entity_id == resolved.edge.source_entity_id
                        && e.source_line == resolved.edge.source_line
                        && e.source_col == resolved.edge.source_col
                }) {
                    *slot = resolved.edge;
                }
            }

            let result = self.resolver.resolve_package(&self.package_root, &entry.external_refs, &index).await;
            if !result.errors.is_empty() {
                warn!(file = %touched.display(), errors = result.errors.len(), "some references failed to resolve");
            }
            for edge in result.edges {
                entry.edges.push(edge);
            }
        }

        self.rewrite_seed(None)
    }

    /// Rewrites the full seed from currently tracked files. `tombstoned`, if
    /// given, is a just-removed file's last parse output: its rows are
    /// included once more with `is_deleted` flipped, then dropped from
    /// future writes since it's no longer in `self.outputs`.
    fn rewrite_seed(&self, tombstoned: Option<ParseOutput>) -> anyhow::Result<()> {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut refs = Vec::new();
        let mut effects = Vec::new();
        for entry in self.outputs.iter() {
            nodes.extend(entry.nodes.iter().cloned());
            edges.extend(entry.edges.iter().cloned());
            refs.extend(entry.external_refs.iter().cloned());
            effects.extend(entry.effects.iter().cloned());
        }

        if let Some(output) = tombstoned {
            nodes.extend(output.nodes.into_iter().map(|mut n| {
                n.is_deleted = true;
                n
            }));
            edges.extend(output.edges);
            refs.extend(output.external_refs);
            effects.extend(output.effects.into_iter().map(|mut e| {
                e.header_mut().is_deleted = true;
                e
            }));
        }

        let writer = self.seed.writer();
        writer.write_all(
            &nodes,
            &edges,
            &refs,
            if effects.is_empty() { None } else { Some(&effects) },
            self.outputs.len(),
        )?;
        self.seed.invalidate_queries();
        Ok(())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

impl From<DevacError> for UpdateResult {
    fn from(err: DevacError) -> Self {
        UpdateResult::failed(0, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn manager(root: &Path) -> UpdateManager {
        UpdateManager::new(
            root.to_path_buf(),
            "base",
            Arc::new(ParserRegistry::new()),
            Arc::new(Resolver::new()),
        )
    }

    #[tokio::test]
    async fn skips_unchanged_content_on_second_pass() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "fn helper() {}").unwrap();
        let mgr = manager(dir.path());

        let event = FileChangeEvent { change_type: ChangeType::Add, file_path: file.clone(), timestamp: 0 };
        let first = mgr.process_file_change(event.clone()).await;
        assert!(first.success && !first.skipped);

        let second = mgr.process_file_change(event).await;
        assert!(second.skipped);
    }

    #[tokio::test]
    async fn unlink_removes_file_from_tracked_state() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "fn helper() {}").unwrap();
        let mgr = manager(dir.path());

        mgr.process_file_change(FileChangeEvent { change_type: ChangeType::Add, file_path: file.clone(), timestamp: 0 })
            .await;
        assert!(mgr.outputs.contains_key(&file));

        let result = mgr
            .process_file_change(FileChangeEvent { change_type: ChangeType::Unlink, file_path: file.clone(), timestamp: 1 })
            .await;
        assert!(result.success);
        assert!(!mgr.outputs.contains_key(&file));
    }

    #[tokio::test]
    async fn unlink_tombstones_rows_instead_of_dropping_them() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "fn helper() {}").unwrap();
        let mgr = manager(dir.path());

        mgr.process_file_change(FileChangeEvent { change_type: ChangeType::Add, file_path: file.clone(), timestamp: 0 })
            .await;
        mgr.process_file_change(FileChangeEvent { change_type: ChangeType::Unlink, file_path: file.clone(), timestamp: 1 })
            .await;

        let nodes = mgr.seed.reader().read_nodes().unwrap();
        assert!(!nodes.is_empty());
        assert!(nodes.iter().all(|n| n.is_deleted));
    }

    #[tokio::test]
    async fn missing_file_add_reports_failure_not_panic() {
        let dir = tempdir().unwrap();
        let mgr = manager(dir.path());
        let result = mgr
            .process_file_change(FileChangeEvent {
                change_type: ChangeType::Add,
                file_path: dir.path().join("missing.rs"),
                timestamp: 0,
            })
            .await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
