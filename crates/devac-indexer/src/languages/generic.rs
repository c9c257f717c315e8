//! Fallback backend for files no dedicated grammar claims. Always succeeds:
//! it produces a single `Module` node with no children and no tree-sitter
//! parse at all, per the indexer's guarantee that a file is never dropped
//! from the graph outright.

use std::path::Path;

use devac_core::{Language, Node, NodeKind, Visibility};

use crate::parser::{LanguageParser, ParseConfig, ParseOutput};

pub struct GenericParser;

impl LanguageParser for GenericParser {
    fn language(&self) -> Language {
        Language::Other
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn version(&self) -> &'static str {
        "generic-fallback"
    }

    fn can_parse(&self, _path: &Path) -> bool {
        true
    }

    fn parse_content(&self, content: &[u8], path: &Path, config: &ParseConfig) -> anyhow::Result<ParseOutput> {
        let start = std::time::Instant::now();
        let relative_path = path.to_string_lossy().to_string();
        let source_hash = devac_core::content_hash(content);
        let line_count = content.iter().filter(|&&b| b == b'\n').count() as u32 + 1;

        let entity_id = devac_core::generate(
            &config.repo_name,
            &config.package_path,
            NodeKind::Module,
            &relative_path,
            &[],
            "<module>",
        );

        let node = Node {
            entity_id,
            name: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
            qualified_name: relative_path.clone(),
            kind: NodeKind::Module,
            file_path: relative_path.clone().into(),
            start_line: 1,
            start_col: 0,
            end_line: line_count,
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
            decorators: Vec::new(),
            type_parameters: Vec::new(),
            properties: Default::default(),
            source_file_hash: source_hash.clone(),
            branch: config.branch.clone(),
            is_deleted: false,
            updated_at: chrono::Utc::now(),
        };

        Ok(ParseOutput {
            nodes: vec![node],
            edges: Vec::new(),
            external_refs: Vec::new(),
            effects: Vec::new(),
            source_file_hash: source_hash,
            file_path: relative_path.into(),
            parse_time_ms: start.elapsed().as_millis() as u64,
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_produces_a_module_node() {
        let parser = GenericParser;
        let config = ParseConfig { repo_name: "r".into(), package_path: "pkg".into(), ..Default::default() };
        let out = parser.parse_content(b"binary\0garbage", Path::new("asset.bin"), &config).unwrap();
        assert_eq!(out.nodes.len(), 1);
        assert_eq!(out.nodes[0].kind, NodeKind::Module);
    }
}
