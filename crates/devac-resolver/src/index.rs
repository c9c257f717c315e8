//! Package-scoped export and local-symbol indices (§4.3).
//!
//! Both indices are rebuilt wholesale from a package's parse outputs on
//! every resolve pass rather than mutated incrementally, so plain
//! `HashMap`s are the right primitive here — there's no concurrent writer
//! to guard against once a snapshot is built.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use devac_core::{EntityId, Node, NodeKind};

/// One exported symbol, as recorded during parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportInfo {
    pub name: String,
    pub kind: NodeKind,
    pub file_path: PathBuf,
    pub entity_id: EntityId,
    pub is_default: bool,
    pub is_type_only: bool,
    pub original_file_path: Option<PathBuf>,
}

/// A package-scoped view built from every file's parse output: what each
/// file exports, and how a module specifier maps to a file on disk.
#[derive(Debug, Clone)]
pub struct ExportIndex {
    pub file_exports: HashMap<PathBuf, Vec<ExportInfo>>,
    pub module_resolution: HashMap<String, PathBuf>,
    pub built_at: chrono::DateTime<chrono::Utc>,
    pub source_hash: String,
}

const INDEX_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "py", "go", "java", "rs"];

impl ExportIndex {
    /// Build the index from every file's nodes. `source_hash` is the
    /// aggregated content hash of the package's files — the cache key a
    /// resolver checks to decide whether a rebuild is needed.
    pub fn build(files: &[(PathBuf, Vec<Node>)], source_hash: String) -> Self {
        let mut file_exports = HashMap::new();
        for (path, nodes) in files {
            let exports: Vec<ExportInfo> = nodes
                .iter()
                .filter(|n| n.is_exported && n.kind != NodeKind::Module)
                .map(|n| ExportInfo {
                    name: n.name.clone(),
                    kind: n.kind,
                    file_path: path.clone(),
                    entity_id: n.entity_id.clone(),
                    is_default: n.is_default_export,
                    is_type_only: false,
                    original_file_path: None,
                })
                .collect();
            file_exports.insert(path.clone(), exports);
        }

        let module_resolution = build_module_resolution(files.iter().map(|(p, _)| p.as_path()));

        ExportIndex {
            file_exports,
            module_resolution,
            built_at: chrono::Utc::now(),
            source_hash,
        }
    }

    /// Build from a package's raw `devac_indexer::ParseOutput`s — the shape
    /// the orchestrator and update manager actually produce. The aggregated
    /// package hash is derived from each file's `source_file_hash`, so it
    /// changes whenever any file in the package changes content.
    pub fn build_from_parse_outputs(outputs: &[devac_indexer::ParseOutput]) -> Self {
        let files: Vec<(PathBuf, Vec<Node>)> = outputs
            .iter()
            .map(|output| (output.file_path.clone(), output.nodes.clone()))
            .collect();
        let mut hashes: Vec<&str> = outputs.iter().map(|o| o.source_file_hash.as_str()).collect();
        hashes.sort_unstable();
        let source_hash = devac_core::string_hash(&hashes.join(","));
        Self::build(&files, source_hash)
    }

    /// Resolve a module specifier relative to `from_file`: direct mapping,
    /// then relative-path resolution with extension and `/index.*` fallback.
    /// Specifiers not starting with `.` or `/` are external packages and are
    /// never resolved here.
    pub fn resolve_specifier(&self, specifier: &str, from_file: &Path) -> Option<&PathBuf> {
        if let Some(path) = self.module_resolution.get(specifier) {
            return Some(path);
        }
        if !(specifier.starts_with('.') || specifier.starts_with('/')) {
            return None;
        }
        let base = from_file.parent().unwrap_or_else(|| Path::new(""));
        let joined = normalize(&base.join(specifier));
        for candidate in candidates(&joined) {
            if let Some(path) = self.module_resolution.get(&candidate) {
                return Some(path);
            }
        }
        None
    }

    pub fn module_entity_for(&self, file_path: &Path) -> Option<&ExportInfo> {
        self.file_exports
            .get(file_path)
            .and_then(|exports| exports.iter().find(|e| e.kind == NodeKind::Module))
    }
}

fn build_module_resolution<'a>(paths: impl Iterator<Item = &'a Path>) -> HashMap<String, PathBuf> {
    let mut map = HashMap::new();
    for path in paths {
        let key = normalize(path);
        map.insert(key, path.to_path_buf());
    }
    map
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Extension and `/index.*` fallback candidates for a path with no resolved
/// extension, e.g. `src/utils` → `src/utils.ts`, `src/utils/index.ts`, ...
fn candidates(base: &str) -> Vec<String> {
    let mut out = vec![base.to_string()];
    for ext in INDEX_EXTENSIONS {
        out.push(format!("{base}.{ext}"));
        out.push(format!("{base}/index.{ext}"));
    }
    out
}

/// Per-file local-symbol index: declarations in the same file, preferred
/// over an exported match when resolving a `CALLS` edge (confidence 1.0
/// vs. 0.9).
#[derive(Debug, Clone, Default)]
pub struct LocalSymbolIndex {
    by_name: HashMap<String, EntityId>,
}

impl LocalSymbolIndex {
    pub fn build(nodes: &[Node]) -> Self {
        let mut by_name = HashMap::new();
        for node in nodes {
            if node.kind == NodeKind::Function || node.kind == NodeKind::Method || node.kind == NodeKind::Class {
                by_name.insert(node.name.clone(), node.entity_id.clone());
            }
        }
        Self { by_name }
    }

    pub fn lookup(&self, name: &str) -> Option<&EntityId> {
        self.by_name.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devac_core::{NodeKind, Visibility};

    fn node(name: &str, kind: NodeKind, exported: bool) -> Node {
        Node {
            entity_id: EntityId(format!("id:{name}")),
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind,
            file_path: "src/a.ts".into(),
            start_line: 1,
            start_col: 0,
            end_line: 1,
            end_col: 0,
            is_exported: exported,
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

    #[test]
    fn resolves_relative_specifier_with_extension_fallback() {
        let files = vec![
            (PathBuf::from("src/a.ts"), vec![node("helper", NodeKind::Function, true)]),
            (PathBuf::from("src/utils.ts"), vec![node("thing", NodeKind::Function, true)]),
        ];
        let index = ExportIndex::build(&files, "h".into());
        let resolved = index.resolve_specifier("./utils", Path::new("src/a.ts"));
        assert_eq!(resolved, Some(&PathBuf::from("src/utils.ts")));
    }

    #[test]
    fn external_specifier_is_never_resolved() {
        let files = vec![(PathBuf::from("src/a.ts"), vec![])];
        let index = ExportIndex::build(&files, "h".into());
        assert_eq!(index.resolve_specifier("react", Path::new("src/a.ts")), None);
    }

    #[test]
    fn local_symbol_index_finds_same_file_declarations() {
        let nodes = vec![node("helper", NodeKind::Function, false)];
        let local = LocalSymbolIndex::build(&nodes);
        assert!(local.lookup("helper").is_some());
        assert!(local.lookup("missing").is_none());
    }
}
