//! Whole-package cold build (§4.7): discover every parseable file under a
//! package root, parse them in parallel, run one resolution pass, and write
//! the result as a fresh seed set.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ignore::WalkBuilder;
use rayon::prelude::*;
use tracing::{info, warn};

use devac_core::string_hash;
use devac_indexer::{ParseConfig, ParseOutput, ParserRegistry};
use devac_resolver::Resolver;
use devac_seed::SeedStore;

#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub success: bool,
    pub skipped: bool,
    pub files_analyzed: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub time_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub if_changed: bool,
    pub force: bool,
    pub repo_name: String,
    pub branch: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { if_changed: false, force: false, repo_name: String::new(), branch: "base".to_string() }
    }
}

/// Drives a package through the analyze pipeline: file discovery, parallel
/// parse, one resolution pass, one atomic seed write.
pub struct AnalyzeOrchestrator {
    registry: Arc<ParserRegistry>,
    resolver: Arc<Resolver>,
}

impl Default for AnalyzeOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzeOrchestrator {
    pub fn new() -> Self {
        Self { registry: Arc::new(ParserRegistry::new()), resolver: Arc::new(Resolver::new()) }
    }

    pub fn with_components(registry: Arc<ParserRegistry>, resolver: Arc<Resolver>) -> Self {
        Self { registry, resolver }
    }

    pub async fn analyze(&self, package_root: &Path, options: &BuildOptions) -> BuildResult {
        let started = Instant::now();

        let files = discover_files(package_root, &self.registry);
        let aggregated_hash = aggregate_hash(package_root, &files);

        let seed = SeedStore::open(package_root, options.branch.clone());

        if options.if_changed && !options.force {
            if let Some(prior_hash) = read_aggregated_hash(&seed) {
                if prior_hash == aggregated_hash {
                    return BuildResult {
                        success: true,
                        skipped: true,
                        files_analyzed: files.len(),
                        time_ms: elapsed_ms(started),
                        ..Default::default()
                    };
                }
            }
        }

        let config = ParseConfig {
            repo_name: options.repo_name.clone(),
            package_path: package_root.to_string_lossy().into_owned(),
            branch: options.branch.clone(),
            ..Default::default()
        };

        let outputs: Vec<ParseOutput> = files
            .par_iter()
            .filter_map(|path| match self.registry.parse(path, &config) {
                Ok(output) => Some(output),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to parse file, skipping");
                    None
                }
            })
            .collect();

        let index = self.resolver.build_export_index_from_outputs(package_root, &outputs);

        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut refs = Vec::new();
        let mut effects = Vec::new();
        for output in &outputs {
            nodes.extend(output.nodes.iter().cloned());
            edges.extend(output.edges.iter().cloned());
            refs.extend(output.external_refs.iter().cloned());
            effects.extend(output.effects.iter().cloned());
        }

        let local = devac_resolver::LocalSymbolIndex::build(&nodes);
        let mut exported = std::collections::HashMap::new();
        for exports in index.file_exports.values() {
            for export in exports {
                exported.entry(export.name.clone()).or_insert_with(|| export.entity_id.clone());
            }
        }

        let stub_calls: Vec<_> = edges.iter().filter(|e| e.edge_type == devac_core::EdgeKind::Calls).cloned().collect();
        let stub_extends: Vec<_> = edges
            .iter()
            .filter(|e| matches!(e.edge_type, devac_core::EdgeKind::Extends | devac_core::EdgeKind::Implements))
            .cloned()
            .collect();
        let resolved_calls = self.resolver.resolve_call_edges(&stub_calls, &local, &exported);
        let resolved_extends = self.resolver.resolve_extends_edges(&stub_extends, &nodes);
        for resolved in resolved_calls.into_iter().chain(resolved_extends) {
            if let Some(slot) = edges.iter_mut().find(|e| {
                e.edge_type == resolved.edge.edge_type
                    && e.source_entity_id == resolved.edge.source_entity_id
                    && e.source_line == resolved.edge.source_line
                    && e.source_col == resolved.edge.source_col
            }) {
                *slot = resolved.edge;
            }
        }

        let resolution = self.resolver.resolve_package(package_root, &refs, &index).await;
        if !resolution.errors.is_empty() {
            warn!(package = %package_root.display(), errors = resolution.errors.len(), "some references failed to resolve");
        }
        edges.extend(resolution.edges);

        let writer = seed.writer();
        let write_result = writer.write_all(
            &nodes,
            &edges,
            &refs,
            if effects.is_empty() { None } else { Some(&effects) },
            files.len(),
        );

        if let Err(e) = write_result {
            return BuildResult { success: false, time_ms: elapsed_ms(started), error: Some(e.to_string()), ..Default::default() };
        }

        if let Err(e) = write_aggregated_hash(&seed, &aggregated_hash) {
            warn!(error = %e, "failed to record aggregated hash, next --if-changed run will rebuild");
        }

        seed.invalidate_queries();

        info!(
            package = %package_root.display(),
            files = files.len(),
            nodes = nodes.len(),
            edges = edges.len(),
            "analyze complete"
        );

        BuildResult {
            success: true,
            skipped: false,
            files_analyzed: files.len(),
            nodes_created: nodes.len(),
            edges_created: edges.len(),
            time_ms: elapsed_ms(started),
            error: None,
        }
    }
}

fn discover_files(root: &Path, registry: &ParserRegistry) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in WalkBuilder::new(root).hidden(false).build() {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_some_and(|t| t.is_file()) && registry.is_recognized(entry.path()) {
            out.push(entry.path().to_path_buf());
        }
    }
    out
}

fn aggregate_hash(root: &Path, files: &[PathBuf]) -> String {
    let mut hashes: Vec<String> = files
        .iter()
        .filter_map(|path| {
            let bytes = std::fs::read(path).ok()?;
            let relative = path.strip_prefix(root).unwrap_or(path);
            Some(format!("{}:{}", relative.to_string_lossy(), devac_core::content_hash(&bytes)))
        })
        .collect();
    hashes.sort_unstable();
    string_hash(&hashes.join(","))
}

/// `SeedStats` has no room for the aggregated hash without perturbing
/// `devac-seed`'s own schema, so the orchestrator keeps it in a sidecar file
/// next to `meta.json` rather than growing that struct for one caller.
fn write_aggregated_hash(seed: &SeedStore, hash: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(seed.layout().seed_dir())?;
    std::fs::write(seed.layout().seed_dir().join("source_hash.txt"), hash)?;
    Ok(())
}

fn read_aggregated_hash(seed: &SeedStore) -> Option<String> {
    std::fs::read_to_string(seed.layout().seed_dir().join("source_hash.txt")).ok()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn analyzes_a_small_package_and_writes_a_seed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn helper() {}\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "not code").unwrap();

        let orchestrator = AnalyzeOrchestrator::new();
        let result = orchestrator.analyze(dir.path(), &BuildOptions::default()).await;

        assert!(result.success);
        assert!(!result.skipped);
        assert_eq!(result.files_analyzed, 1);
        assert!(result.nodes_created >= 1);
    }

    #[tokio::test]
    async fn if_changed_skips_when_nothing_changed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn helper() {}\n").unwrap();

        let orchestrator = AnalyzeOrchestrator::new();
        let options = BuildOptions { if_changed: true, ..Default::default() };

        let first = orchestrator.analyze(dir.path(), &options).await;
        assert!(first.success && !first.skipped);

        let second = orchestrator.analyze(dir.path(), &options).await;
        assert!(second.skipped);
    }

    #[tokio::test]
    async fn force_bypasses_if_changed_short_circuit() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn helper() {}\n").unwrap();

        let orchestrator = AnalyzeOrchestrator::new();
        let options = BuildOptions { if_changed: true, force: true, ..Default::default() };

        orchestrator.analyze(dir.path(), &options).await;
        let second = orchestrator.analyze(dir.path(), &options).await;
        assert!(!second.skipped);
    }
}
