//! Python language backend.

use std::path::Path;

use devac_core::{
    Edge, EdgeKind, EntityId, Effect, EffectHeader, ExternalRef, ImportStyle, Language, Node,
    NodeKind, Visibility,
};
use tree_sitter::Node as TsNode;

use crate::effects;
use crate::parser::{LanguageParser, ParseConfig, ParseOutput, ParseWarning};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct PythonParser {
    pool: ParserPool,
}

impl PythonParser {
    pub fn new(pool: ParserPool) -> Self {
        Self { pool }
    }

    fn line(point: tree_sitter::Point) -> u32 {
        point.row as u32 + 1
    }

    fn entity_id(config: &ParseConfig, relative_path: &str, kind: NodeKind, scope: &[&str], name: &str) -> EntityId {
        devac_core::generate(&config.repo_name, &config.package_path, kind, relative_path, scope, name)
    }
}

struct Walker<'a> {
    config: &'a ParseConfig,
    relative_path: String,
    source_hash: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    external_refs: Vec<ExternalRef>,
    effects: Vec<Effect>,
    warnings: Vec<ParseWarning>,
}

impl<'a> Walker<'a> {
    fn make_node(
        &self,
        id: EntityId,
        name: &str,
        qualified_name: String,
        kind: NodeKind,
        node: TsNode,
        is_container: bool,
        decorators: Vec<String>,
    ) -> Node {
        let mut n = Node {
            entity_id: id,
            name: name.to_string(),
            qualified_name,
            kind,
            file_path: self.relative_path.clone().into(),
            start_line: PythonParser::line(node.start_position()),
            start_col: node.start_position().column as u32,
            end_line: PythonParser::line(node.end_position()),
            end_col: node.end_position().column as u32,
            is_exported: true,
            is_default_export: false,
            visibility: Visibility::Public,
            is_async: false,
            is_generator: false,
            is_static: false,
            is_abstract: false,
            type_signature: None,
            documentation: None,
            decorators,
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

    fn decorators_of(&self, node: TsNode, source: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        let Some(parent) = node.parent() else { return out };
        if parent.kind() != "decorated_definition" {
            return out;
        }
        let mut cursor = parent.walk();
        for child in parent.children(&mut cursor) {
            if child.kind() == "decorator" {
                if let Ok(text) = child.utf8_text(source) {
                    out.push(text.trim_start_matches('@').to_string());
                }
            }
        }
        out
    }

    /// Extracts `(method, route_pattern)` from a Flask-style route decorator
    /// such as `@app.route("/users/<id>", methods=["POST"])`.
    fn route_from_decorator(decorator: &str) -> Option<(String, String)> {
        if !effects::python_route_decorator(decorator) {
            return None;
        }
        let path = decorator
            .find('(')
            .and_then(|start| decorator[start + 1..].split([',', ')']).next())
            .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').to_string())?;

        let method = if decorator.contains(".post(") {
            "POST".to_string()
        } else if decorator.contains(".put(") {
            "PUT".to_string()
        } else if decorator.contains(".delete(") {
            "DELETE".to_string()
        } else if decorator.contains(".patch(") {
            "PATCH".to_string()
        } else if let Some(start) = decorator.find("methods=[") {
            decorator[start + "methods=[".len()..]
                .split(']')
                .next()
                .and_then(|verbs| verbs.split(',').next())
                .map(|v| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                .unwrap_or_else(|| "GET".to_string())
        } else {
            "GET".to_string()
        };

        Some((method, path))
    }

    fn record_route_effects(&mut self, node: TsNode, source_entity: &EntityId, decorators: &[String]) {
        for decorator in decorators {
            let Some((method, route_pattern)) = Self::route_from_decorator(decorator) else { continue };
            let effect_id = format!("{}:{}:route", self.relative_path, node.start_position().row);
            let header = EffectHeader {
                effect_id,
                source_entity_id: source_entity.clone(),
                source_file_path: self.relative_path.clone().into(),
                source_line: PythonParser::line(node.start_position()),
                source_col: node.start_position().column as u32,
                is_deleted: false,
            };
            self.effects.push(Effect::Request {
                header,
                method,
                route_pattern,
                framework: "decorator".to_string(),
            });
        }
    }

    fn walk(&mut self, node: TsNode, source: &[u8], scope: &[&str], container_id: Option<&EntityId>) {
        match node.kind() {
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if let Ok(name) = name_node.utf8_text(source) {
                        let kind = if !scope.is_empty() { NodeKind::Method } else { NodeKind::Function };
                        let decorators = self.decorators_of(node, source);
                        let id = PythonParser::entity_id(self.config, &self.relative_path, kind, scope, name);
                        let qualified = if scope.is_empty() {
                            format!("{}::{}", self.relative_path, name)
                        } else {
                            format!("{}::{}::{}", self.relative_path, scope.join("::"), name)
                        };
                        let n = self.make_node(id.clone(), name, qualified, kind, node, false, decorators.clone());
                        self.nodes.push(n);
                        self.record_route_effects(node, &id, &decorators);
                        if let Some(parent_id) = container_id {
                            self.edges.push(Edge {
                                source_entity_id: parent_id.clone(),
                                target_entity_id: id.clone(),
                                edge_type: EdgeKind::Contains,
                                source_line: PythonParser::line(node.start_position()),
                                source_col: 0,
                                properties: Default::default(),
                            });
                        }
                        if let Some(body) = node.child_by_field_name("body") {
                            self.walk_calls(body, source, &id);
                            let mut new_scope: Vec<&str> = scope.to_vec();
                            new_scope.push(name);
                            self.walk(body, source, &new_scope, Some(&id));
                        }
                        return;
                    }
                }
            }
            "class_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if let Ok(name) = name_node.utf8_text(source) {
                        let id = PythonParser::entity_id(self.config, &self.relative_path, NodeKind::Class, scope, name);
                        let qualified = format!("{}::{}", self.relative_path, name);
                        let n = self.make_node(id.clone(), name, qualified, NodeKind::Class, node, true, Vec::new());
                        self.nodes.push(n);
                        if let Some(parent_id) = container_id {
                            self.edges.push(Edge {
                                source_entity_id: parent_id.clone(),
                                target_entity_id: id.clone(),
                                edge_type: EdgeKind::Contains,
                                source_line: PythonParser::line(node.start_position()),
                                source_col: 0,
                                properties: Default::default(),
                            });
                        }
                        if let Some(body) = node.child_by_field_name("body") {
                            let mut new_scope: Vec<&str> = scope.to_vec();
                            new_scope.push(name);
                            self.walk(body, source, &new_scope, Some(&id));
                        }
                        return;
                    }
                }
            }
            "import_statement" => {
                self.record_import(node, source, false);
            }
            "import_from_statement" => {
                self.record_import(node, source, true);
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, source, scope, container_id);
        }
    }

    fn walk_calls(&mut self, node: TsNode, source: &[u8], source_entity: &EntityId) {
        if node.kind() == "call" {
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
            source_line: PythonParser::line(node.start_position()),
            source_col: node.start_position().column as u32,
            properties: props,
        });

        let effect_id = format!("{}:{}:{}", self.relative_path, node.start_position().row, callee);
        let header = EffectHeader {
            effect_id: effect_id.clone(),
            source_entity_id: source_entity.clone(),
            source_file_path: self.relative_path.clone().into(),
            source_line: PythonParser::line(node.start_position()),
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
            if let Some(arg) = node
                .child_by_field_name("arguments")
                .and_then(|args| args.named_child(0))
            {
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

    fn record_import(&mut self, node: TsNode, source: &[u8], is_from: bool) {
        let file_entity = PythonParser::entity_id(
            self.config,
            &self.relative_path,
            NodeKind::Module,
            &[],
            "<module>",
        );

        if is_from {
            let Some(module_node) = node.child_by_field_name("module_name") else { return };
            let Ok(module) = module_node.utf8_text(source) else { return };
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "dotted_name" && child != module_node {
                    if let Ok(symbol) = child.utf8_text(source) {
                        self.external_refs.push(ExternalRef {
                            source_entity_id: file_entity.clone(),
                            source_file_path: self.relative_path.clone().into(),
                            module_specifier: module.to_string(),
                            imported_symbol: symbol.to_string(),
                            local_alias: None,
                            is_type_only: false,
                            is_default: false,
                            is_namespace: false,
                            import_style: ImportStyle::Named,
                            is_reexport: false,
                        });
                    }
                }
            }
        } else {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "dotted_name" {
                    if let Ok(module) = child.utf8_text(source) {
                        self.external_refs.push(ExternalRef {
                            source_entity_id: file_entity.clone(),
                            source_file_path: self.relative_path.clone().into(),
                            module_specifier: module.to_string(),
                            imported_symbol: module.to_string(),
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
        }
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn version(&self) -> &'static str {
        "tree-sitter-python 0.23"
    }

    fn parse_content(&self, content: &[u8], path: &Path, config: &ParseConfig) -> anyhow::Result<ParseOutput> {
        let start = std::time::Instant::now();
        let source_code = std::str::from_utf8(content)?;
        let relative_path = path.to_string_lossy().to_string();
        let source_hash = devac_core::content_hash(content);

        let request = ParseRequest {
            file_type: FileType::Python,
            content: source_code.to_string(),
            path: path.to_path_buf(),
        };
        let parsed = self.pool.parse_blocking(request)?;

        let module_id = PythonParser::entity_id(config, &relative_path, NodeKind::Module, &[], "<module>");
        let module_node = Node {
            entity_id: module_id.clone(),
            name: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
            qualified_name: relative_path.clone(),
            kind: NodeKind::Module,
            file_path: relative_path.clone().into(),
            start_line: 1,
            start_col: 0,
            end_line: PythonParser::line(parsed.tree.root_node().end_position()),
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

        let mut walker = Walker {
            config,
            relative_path: relative_path.clone(),
            source_hash: source_hash.clone(),
            nodes: vec![module_node],
            edges: Vec::new(),
            external_refs: Vec::new(),
            effects: Vec::new(),
            warnings: Vec::new(),
        };

        if parsed.tree.root_node().has_error() {
            walker.warnings.push(ParseWarning {
                message: "syntax error in file; continuing with best-effort AST".to_string(),
                line: None,
            });
        }

        walker.walk(parsed.tree.root_node(), source_code.as_bytes(), &[], Some(&module_id));

        Ok(ParseOutput {
            nodes: walker.nodes,
            edges: walker.edges,
            external_refs: walker.external_refs,
            effects: walker.effects,
            source_file_hash: source_hash,
            file_path: relative_path.into(),
            parse_time_ms: start.elapsed().as_millis() as u64,
            warnings: walker.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::create_parser_pool;

    #[test]
    fn extracts_function_and_class() {
        let parser = PythonParser::new(create_parser_pool());
        let source = b"def helper():\n    pass\n\nclass Service:\n    def run(self):\n        helper()\n";
        let config = ParseConfig { repo_name: "r".into(), package_path: "pkg".into(), ..Default::default() };
        let out = parser.parse_content(source, Path::new("src/a.py"), &config).unwrap();

        assert!(out.nodes.iter().any(|n| n.name == "helper" && n.kind == NodeKind::Function));
        assert!(out.nodes.iter().any(|n| n.name == "Service" && n.kind == NodeKind::Class));
        assert!(out.edges.iter().any(|e| e.edge_type == EdgeKind::Calls));
    }

    #[test]
    fn records_import_as_external_ref_not_edge() {
        let parser = PythonParser::new(create_parser_pool());
        let source = b"from .utils import helper\n";
        let config = ParseConfig { repo_name: "r".into(), package_path: "pkg".into(), ..Default::default() };
        let out = parser.parse_content(source, Path::new("src/a.py"), &config).unwrap();

        assert_eq!(out.external_refs.len(), 1);
        assert_eq!(out.external_refs[0].imported_symbol, "helper");
        assert!(out.edges.iter().all(|e| e.edge_type != EdgeKind::Imports));
    }

    #[test]
    fn records_request_effect_from_route_decorator() {
        let parser = PythonParser::new(create_parser_pool());
        let source = b"@app.route(\"/users\", methods=[\"POST\"])\ndef create_user():\n    pass\n";
        let config = ParseConfig { repo_name: "r".into(), package_path: "pkg".into(), ..Default::default() };
        let out = parser.parse_content(source, Path::new("src/a.py"), &config).unwrap();

        assert!(out.effects.iter().any(|e| matches!(
            e,
            Effect::Request { method, route_pattern, .. }
                if method == "POST" && route_pattern == "/users"
        )));
    }
}
