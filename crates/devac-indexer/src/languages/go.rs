//! Go language backend.

use std::path::Path;

use devac_core::{
    Edge, EdgeKind, EntityId, Effect, EffectHeader, ExternalRef, ImportStyle, Language, Node,
    NodeKind, Visibility,
};
use tree_sitter::Node as TsNode;

use crate::effects;
use crate::parser::{LanguageParser, ParseConfig, ParseOutput, ParseWarning};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct GoParser {
    pool: ParserPool,
}

impl GoParser {
    pub fn new(pool: ParserPool) -> Self {
        Self { pool }
    }

    fn line(point: tree_sitter::Point) -> u32 {
        point.row as u32 + 1
    }

    fn entity_id(config: &ParseConfig, relative_path: &str, kind: NodeKind, name: &str) -> EntityId {
        devac_core::generate(&config.repo_name, &config.package_path, kind, relative_path, &[], name)
    }
}

struct Walker<'a> {
    config: &'a ParseConfig,
    relative_path: String,
    source_hash: String,
    module_entity: EntityId,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    external_refs: Vec<ExternalRef>,
    effects: Vec<Effect>,
}

impl<'a> Walker<'a> {
    fn make_node(&self, id: EntityId, name: &str, kind: NodeKind, node: TsNode, is_container: bool) -> Node {
        let mut n = Node {
            entity_id: id,
            name: name.to_string(),
            qualified_name: format!("{}::{}", self.relative_path, name),
            kind,
            file_path: self.relative_path.clone().into(),
            start_line: GoParser::line(node.start_position()),
            start_col: node.start_position().column as u32,
            end_line: GoParser::line(node.end_position()),
            end_col: node.end_position().column as u32,
            is_exported: name.chars().next().is_some_and(|c| c.is_uppercase()),
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
            source_file_hash: self.source_hash.clone(),
            branch: self.config.branch.clone(),
            is_deleted: false,
            updated_at: chrono::Utc::now(),
        };
        n.properties.insert("isContainer".to_string(), serde_json::json!(is_container));
        n
    }

    fn walk(&mut self, node: TsNode, source: &[u8]) {
        match node.kind() {
            "function_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if let Ok(name) = name_node.utf8_text(source) {
                        let id = GoParser::entity_id(self.config, &self.relative_path, NodeKind::Function, name);
                        self.nodes.push(self.make_node(id.clone(), name, NodeKind::Function, node, false));
                        self.edges.push(Edge {
                            source_entity_id: self.module_entity.clone(),
                            target_entity_id: id.clone(),
                            edge_type: EdgeKind::Contains,
                            source_line: GoParser::line(node.start_position()),
                            source_col: 0,
                            properties: Default::default(),
                        });
                        if let Some(body) = node.child_by_field_name("body") {
                            self.walk_calls(body, source, &id);
                        }
                    }
                }
            }
            "method_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if let Ok(name) = name_node.utf8_text(source) {
                        let id = GoParser::entity_id(self.config, &self.relative_path, NodeKind::Method, name);
                        self.nodes.push(self.make_node(id.clone(), name, NodeKind::Method, node, false));
                        self.edges.push(Edge {
                            source_entity_id: self.module_entity.clone(),
                            target_entity_id: id.clone(),
                            edge_type: EdgeKind::Contains,
                            source_line: GoParser::line(node.start_position()),
                            source_col: 0,
                            properties: Default::default(),
                        });
                        if let Some(body) = node.child_by_field_name("body") {
                            self.walk_calls(body, source, &id);
                        }
                    }
                }
            }
            "type_spec" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if let Ok(name) = name_node.utf8_text(source) {
                        let kind = node
                            .child_by_field_name("type")
                            .map(|t| t.kind())
                            .filter(|k| *k == "interface_type")
                            .map(|_| NodeKind::Interface)
                            .unwrap_or(NodeKind::Class);
                        let id = GoParser::entity_id(self.config, &self.relative_path, kind, name);
                        self.nodes.push(self.make_node(id.clone(), name, kind, node, true));
                        self.edges.push(Edge {
                            source_entity_id: self.module_entity.clone(),
                            target_entity_id: id,
                            edge_type: EdgeKind::Contains,
                            source_line: GoParser::line(node.start_position()),
                            source_col: 0,
                            properties: Default::default(),
                        });
                    }
                }
            }
            "import_spec" => {
                if let Some(path_node) = node.child_by_field_name("path") {
                    if let Ok(raw) = path_node.utf8_text(source) {
                        let module = raw.trim_matches('"').to_string();
                        self.external_refs.push(ExternalRef {
                            source_entity_id: self.module_entity.clone(),
                            source_file_path: self.relative_path.clone().into(),
                            module_specifier: module.clone(),
                            imported_symbol: module,
                            local_alias: None,
                            is_type_only: false,
                            is_default: false,
                            is_namespace: true,
                            import_style: ImportStyle::Namespace,
                            is_reexport: false,
                        });
                    }
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, source);
        }
    }

    fn walk_calls(&mut self, node: TsNode, source: &[u8], source_entity: &EntityId) {
        if node.kind() == "call_expression" {
            if let Some(function) = node.child_by_field_name("function") {
                if let Ok(callee) = function.utf8_text(source) {
                    self.record_call(node, source, callee, source_entity);
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk_calls(child, source, source_entity);
        }
    }

    fn record_call(&mut self, node: TsNode, source: &[u8], callee: &str, source_entity: &EntityId) {
        let last_segment = callee.rsplit('.').next().unwrap_or(callee);
        let arg_count = node
            .child_by_field_name("arguments")
            .map(|args| args.named_child_count() as u32)
            .unwrap_or(0);

        let mut props = std::collections::BTreeMap::new();
        props.insert("argumentCount".to_string(), serde_json::json!(arg_count));

        self.edges.push(Edge {
            source_entity_id: source_entity.clone(),
            target_entity_id: EntityId::unresolved(last_segment),
            edge_type: EdgeKind::Calls,
            source_line: GoParser::line(node.start_position()),
            source_col: node.start_position().column as u32,
            properties: props,
        });

        let effect_id = format!("{}:{}:{}", self.relative_path, node.start_position().row, callee);
        let header = EffectHeader {
            effect_id,
            source_entity_id: source_entity.clone(),
            source_file_path: self.relative_path.clone().into(),
            source_line: GoParser::line(node.start_position()),
            source_col: node.start_position().column as u32,
            is_deleted: false,
        };
        self.effects.push(Effect::FunctionCall {
            header: header.clone(),
            callee_name: callee.to_string(),
            is_method_call: callee.contains('.'),
            is_constructor: false,
            is_async: false,
            argument_count: arg_count,
            is_external: !last_segment.eq(callee),
            external_module: None,
        });

        if let Some((send_type, method, is_third_party)) = effects::classify_send(callee) {
            if let Some(arg) = node.child_by_field_name("arguments").and_then(|args| args.named_child(0)) {
                if let Ok(target) = arg.utf8_text(source) {
                    let target = target.trim_matches(|c| c == '"' || c == '\'').to_string();
                    let service_name = effects::service_name_from_url(&target);
                    self.effects.push(Effect::Send {
                        header,
                        send_type,
                        method: method.to_string(),
                        target,
                        service_name,
                        is_third_party,
                    });
                }
            }
        }
    }
}

impl LanguageParser for GoParser {
    fn language(&self) -> Language {
        Language::Go
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn version(&self) -> &'static str {
        "tree-sitter-go 0.23"
    }

    fn parse_content(&self, content: &[u8], path: &Path, config: &ParseConfig) -> anyhow::Result<ParseOutput> {
        let start = std::time::Instant::now();
        let source_code = std::str::from_utf8(content)?;
        let relative_path = path.to_string_lossy().to_string();
        let source_hash = devac_core::content_hash(content);

        let request = ParseRequest {
            file_type: FileType::Go,
            content: source_code.to_string(),
            path: path.to_path_buf(),
        };
        let parsed = self.pool.parse_blocking(request)?;

        let module_id = GoParser::entity_id(config, &relative_path, NodeKind::Module, "<module>");
        let module_node = Node {
            entity_id: module_id.clone(),
            name: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
            qualified_name: relative_path.clone(),
            kind: NodeKind::Module,
            file_path: relative_path.clone().into(),
            start_line: 1,
            start_col: 0,
            end_line: GoParser::line(parsed.tree.root_node().end_position()),
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

        let mut warnings = Vec::new();
        if parsed.tree.root_node().has_error() {
            warnings.push(ParseWarning {
                message: "syntax error in file; continuing with best-effort AST".to_string(),
                line: None,
            });
        }

        let mut walker = Walker {
            config,
            relative_path: relative_path.clone(),
            source_hash: source_hash.clone(),
            module_entity: module_id.clone(),
            nodes: vec![module_node],
            edges: Vec::new(),
            external_refs: Vec::new(),
            effects: Vec::new(),
        };
        walker.walk(parsed.tree.root_node(), source_code.as_bytes());

        Ok(ParseOutput {
            nodes: walker.nodes,
            edges: walker.edges,
            external_refs: walker.external_refs,
            effects: walker.effects,
            source_file_hash: source_hash,
            file_path: relative_path.into(),
            parse_time_ms: start.elapsed().as_millis() as u64,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::create_parser_pool;

    #[test]
    fn extracts_function_and_import() {
        let parser = GoParser::new(create_parser_pool());
        let source = b"package main\n\nimport \"fmt\"\n\nfunc Hello() {\n\tfmt.Println(\"hi\")\n}\n";
        let config = ParseConfig { repo_name: "r".into(), package_path: "pkg".into(), ..Default::default() };
        let out = parser.parse_content(source, Path::new("main.go"), &config).unwrap();

        assert!(out.nodes.iter().any(|n| n.name == "Hello" && n.kind == NodeKind::Function));
        assert_eq!(out.external_refs.len(), 1);
        assert_eq!(out.external_refs[0].module_specifier, "fmt");
    }

    #[test]
    fn records_calls_edges_and_effects() {
        let parser = GoParser::new(create_parser_pool());
        let source = b"package main\n\nfunc helper() {}\n\nfunc caller() {\n\thelper()\n}\n";
        let config = ParseConfig { repo_name: "r".into(), package_path: "pkg".into(), ..Default::default() };
        let out = parser.parse_content(source, Path::new("main.go"), &config).unwrap();

        assert!(out.edges.iter().any(|e| e.edge_type == EdgeKind::Calls));
        assert!(out
            .effects
            .iter()
            .any(|e| matches!(e, Effect::FunctionCall { callee_name, .. } if callee_name == "helper")));
    }
}
