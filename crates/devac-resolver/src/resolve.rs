//! Resolution passes (§4.3): external refs → edges, plus the specialised
//! `CALLS`/`EXTENDS` passes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dashmap::DashMap;
use devac_core::{DevacError, Edge, EdgeKind, EntityId, ExternalRef, ImportStyle, Node, NodeKind};

use crate::index::{ExportIndex, LocalSymbolIndex};

const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Member names common enough across languages that resolving their `CALLS`
/// target is pure noise.
const CALL_SKIP_LIST: &[&str] = &["log", "map", "filter", "push", "pop", "forEach", "toString", "join"];

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRef {
    pub edge: Edge,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    pub edges: Vec<Edge>,
    pub errors: Vec<ResolutionError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionError {
    pub code: &'static str,
    pub message: String,
}

impl From<DevacError> for ResolutionError {
    fn from(err: DevacError) -> Self {
        ResolutionError { code: err.code(), message: err.to_string() }
    }
}

/// Caches one `ExportIndex` per package, invalidated whenever the package's
/// aggregated source hash changes.
#[derive(Default)]
pub struct Resolver {
    cache: DashMap<PathBuf, ExportIndex>,
    batch_size: usize,
    timeout: Duration,
}

impl Resolver {
    pub fn new() -> Self {
        Self { cache: DashMap::new(), batch_size: DEFAULT_BATCH_SIZE, timeout: DEFAULT_TIMEOUT }
    }

    pub fn is_available(&self) -> bool {
        true
    }

    pub fn clear_cache(&self, package_path: &Path) {
        self.cache.remove(package_path);
    }

    pub fn clear_all_caches(&self) {
        self.cache.clear();
    }

    /// Build (or reuse) the package's `ExportIndex`. Cached entries are
    /// invalidated when `source_hash` no longer matches.
    pub fn build_export_index(
        &self,
        package_path: &Path,
        files: &[(PathBuf, Vec<Node>)],
        source_hash: &str,
    ) -> ExportIndex {
        if let Some(cached) = self.cache.get(package_path) {
            if cached.source_hash == source_hash {
                return cached.clone();
            }
        }
        let index = ExportIndex::build(files, source_hash.to_string());
        self.cache.insert(package_path.to_path_buf(), index.clone());
        index
    }

    /// Same as `build_export_index`, fed directly from the orchestrator's
    /// `devac_indexer::ParseOutput`s.
    pub fn build_export_index_from_outputs(
        &self,
        package_path: &Path,
        outputs: &[devac_indexer::ParseOutput],
    ) -> ExportIndex {
        let index = ExportIndex::build_from_parse_outputs(outputs);
        if let Some(cached) = self.cache.get(package_path) {
            if cached.source_hash == index.source_hash {
                return cached.clone();
            }
        }
        self.cache.insert(package_path.to_path_buf(), index.clone());
        index
    }

    /// Resolve a single `ExternalRef` against the package index.
    pub fn resolve_ref(&self, reference: &ExternalRef, index: &ExportIndex) -> Option<ResolvedRef> {
        if !(reference.module_specifier.starts_with('.') || reference.module_specifier.starts_with('/')) {
            return None;
        }
        let target_file = index.resolve_specifier(&reference.module_specifier, &reference.source_file_path)?;
        let exports = index.file_exports.get(target_file)?;

        let (target_id, confidence) = match reference.import_style {
            ImportStyle::Default => exports.iter().find(|e| e.is_default).map(|e| (e.entity_id.clone(), 0.9))?,
            ImportStyle::Namespace => {
                let module = index.module_entity_for(target_file);
                match module {
                    Some(entry) => (entry.entity_id.clone(), 0.9),
                    None => (EntityId::unresolved(&reference.module_specifier), 0.85),
                }
            }
            _ => exports
                .iter()
                .find(|e| e.name == reference.imported_symbol)
                .map(|e| (e.entity_id.clone(), 0.9))?,
        };

        Some(ResolvedRef {
            edge: Edge {
                source_entity_id: reference.source_entity_id.clone(),
                target_entity_id: target_id,
                edge_type: EdgeKind::Imports,
                source_line: 0,
                source_col: 0,
                properties: Default::default(),
            },
            confidence,
        })
    }

    /// Resolve every ref for a package in fixed-size batches under a
    /// per-package wall-clock timeout. Remaining refs after a timeout are
    /// reported as `TIMEOUT` errors; partial results are returned.
    pub async fn resolve_package(&self, package_path: &Path, refs: &[ExternalRef], index: &ExportIndex) -> ResolutionResult {
        tracing::debug!(package = %package_path.display(), ref_count = refs.len(), "resolving package refs");
        let mut result = ResolutionResult::default();
        let deadline = tokio::time::Instant::now() + self.timeout;

        for batch in refs.chunks(self.batch_size) {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                for reference in batch {
                    result.errors.push(ResolutionError {
                        code: DevacError::Timeout.code(),
                        message: format!("timed out resolving {}", reference.module_specifier),
                    });
                }
                continue;
            }

            let batch_result = tokio::time::timeout(remaining, async {
                let mut edges = Vec::new();
                let mut errors = Vec::new();
                for reference in batch {
                    match self.resolve_ref(reference, index) {
                        Some(resolved) => edges.push(resolved.edge),
                        None if reference.module_specifier.starts_with('.') || reference.module_specifier.starts_with('/') => {
                            errors.push(ResolutionError {
                                code: DevacError::ModuleNotFound(reference.module_specifier.clone()).code(),
                                message: format!("module not found: {}", reference.module_specifier),
                            });
                        }
                        None => {}
                    }
                }
                (edges, errors)
            })
            .await;

            match batch_result {
                Ok((edges, errors)) => {
                    result.edges.extend(edges);
                    result.errors.extend(errors);
                }
                Err(_) => {
                    for reference in batch {
                        result.errors.push(ResolutionError {
                            code: DevacError::Timeout.code(),
                            message: format!("timed out resolving {}", reference.module_specifier),
                        });
                    }
                }
            }
        }

        result
    }

    /// Resolve `CALLS` edge stubs against the export index and a per-file
    /// local-symbol index, preferring a local match (1.0) over an exported
    /// one (0.9). Skip-listed member names and built-ins are left unresolved.
    pub fn resolve_call_edges(
        &self,
        stub_edges: &[Edge],
        local: &LocalSymbolIndex,
        exported: &HashMap<String, EntityId>,
    ) -> Vec<ResolvedRef> {
        let mut out = Vec::new();
        for edge in stub_edges {
            if edge.edge_type != EdgeKind::Calls || !edge.target_entity_id.is_unresolved() {
                continue;
            }
            let raw = edge.target_entity_id.as_str().trim_start_matches("unresolved:");
            let last_segment = raw.rsplit('.').next().unwrap_or(raw);
            if CALL_SKIP_LIST.contains(&last_segment) {
                continue;
            }

            let resolved = local
                .lookup(last_segment)
                .map(|id| (id.clone(), 1.0))
                .or_else(|| exported.get(last_segment).map(|id| (id.clone(), 0.9)));

            if let Some((target_id, confidence)) = resolved {
                let mut new_edge = edge.clone();
                new_edge.target_entity_id = target_id;
                out.push(ResolvedRef { edge: new_edge, confidence });
            }
        }
        out
    }

    /// `EXTENDS`/`IMPLEMENTS` resolution is type-aware: classes only match
    /// class targets, interfaces only match interface targets.
    pub fn resolve_extends_edges(&self, stub_edges: &[Edge], candidates: &[Node]) -> Vec<ResolvedRef> {
        let mut out = Vec::new();
        for edge in stub_edges {
            if !matches!(edge.edge_type, EdgeKind::Extends | EdgeKind::Implements) || !edge.target_entity_id.is_unresolved() {
                continue;
            }
            let wanted_name = edge.target_entity_id.as_str().trim_start_matches("unresolved:");
            let source_kind = candidates.iter().find(|n| n.entity_id == edge.source_entity_id).map(|n| n.kind);
            let Some(source_kind) = source_kind else { continue };

            let target = candidates.iter().find(|n| {
                n.name == wanted_name
                    && match source_kind {
                        NodeKind::Interface => n.kind == NodeKind::Interface,
                        _ => n.kind == NodeKind::Class,
                    }
            });

            if let Some(target) = target {
                let mut new_edge = edge.clone();
                new_edge.target_entity_id = target.entity_id.clone();
                out.push(ResolvedRef { edge: new_edge, confidence: 0.9 });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devac_core::Visibility;

    fn node(name: &str, kind: NodeKind, file: &str) -> Node {
        Node {
            entity_id: EntityId(format!("id:{file}:{name}")),
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind,
            file_path: file.into(),
            start_line: 1,
            start_col: 0,
            end_line: 1,
            end_col: 0,
            is_exported: true,
            is_default_export: false,
            visibility: Visibility::Public,
            is_async: false,
            is_generator: false,
            is_static: false,
            is_abstract: false,
            type_signature: None,
            documentation: None,
            decorators: vec![],
            type_parameters: vec![],
            properties: Default::default(),
            source_file_hash: "h".into(),
            branch: "main".into(),
            is_deleted: false,
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn resolves_named_import_to_exported_entity() {
        let resolver = Resolver::new();
        let files = vec![
            (PathBuf::from("src/a.ts"), vec![]),
            (PathBuf::from("src/utils.ts"), vec![node("helper", NodeKind::Function, "src/utils.ts")]),
        ];
        let index = resolver.build_export_index(Path::new("pkg"), &files, "h1");

        let reference = ExternalRef {
            source_entity_id: EntityId("id:src/a.ts:<module>".into()),
            source_file_path: "src/a.ts".into(),
            module_specifier: "./utils".into(),
            imported_symbol: "helper".into(),
            local_alias: None,
            is_type_only: false,
            is_default: false,
            is_namespace: false,
            import_style: ImportStyle::Named,
            is_reexport: false,
        };

        let result = resolver.resolve_package(Path::new("pkg"), std::slice::from_ref(&reference), &index).await;
        assert_eq!(result.edges.len(), 1);
        assert!(!result.edges[0].target_entity_id.is_unresolved());
    }

    #[test]
    fn call_resolution_prefers_local_over_exported() {
        let resolver = Resolver::new();
        let local_node = node("helper", NodeKind::Function, "src/a.ts");
        let local = LocalSymbolIndex::build(std::slice::from_ref(&local_node));
        let mut exported = HashMap::new();
        exported.insert("helper".to_string(), EntityId("id:other:helper".into()));

        let stub = Edge {
            source_entity_id: EntityId("id:src/a.ts:caller".into()),
            target_entity_id: EntityId::unresolved("helper"),
            edge_type: EdgeKind::Calls,
            source_line: 3,
            source_col: 0,
            properties: Default::default(),
        };

        let resolved = resolver.resolve_call_edges(&[stub], &local, &exported);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].confidence, 1.0);
        assert_eq!(resolved[0].edge.target_entity_id, local_node.entity_id);
    }

    #[test]
    fn skip_listed_calls_are_left_unresolved() {
        let resolver = Resolver::new();
        let local = LocalSymbolIndex::default();
        let exported = HashMap::new();
        let stub = Edge {
            source_entity_id: EntityId("id:a".into()),
            target_entity_id: EntityId::unresolved("log"),
            edge_type: EdgeKind::Calls,
            source_line: 1,
            source_col: 0,
            properties: Default::default(),
        };
        assert!(resolver.resolve_call_edges(&[stub], &local, &exported).is_empty());
    }

    #[test]
    fn builds_export_index_directly_from_parse_outputs() {
        let resolver = Resolver::new();
        let output = devac_indexer::ParseOutput {
            nodes: vec![node("helper", NodeKind::Function, "src/a.ts")],
            file_path: "src/a.ts".into(),
            source_file_hash: "hash-a".into(),
            ..Default::default()
        };
        let index = resolver.build_export_index_from_outputs(Path::new("pkg"), &[output]);
        assert!(index.file_exports.contains_key(Path::new("src/a.ts")));
    }

    #[test]
    fn extends_resolution_is_type_aware() {
        let resolver = Resolver::new();
        let base_class = node("Animal", NodeKind::Class, "src/a.ts");
        let base_interface = node("Animal", NodeKind::Interface, "src/b.ts");
        let derived = node("Dog", NodeKind::Class, "src/c.ts");

        let stub = Edge {
            source_entity_id: derived.entity_id.clone(),
            target_entity_id: EntityId::unresolved("Animal"),
            edge_type: EdgeKind::Extends,
            source_line: 1,
            source_col: 0,
            properties: Default::default(),
        };

        let candidates = vec![base_class.clone(), base_interface, derived];
        let resolved = resolver.resolve_extends_edges(&[stub], &candidates);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].edge.target_entity_id, base_class.entity_id);
    }
}
