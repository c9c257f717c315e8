//! JavaScript/TypeScript language backend. TypeScript reuses this walker —
//! the two grammars agree on every node kind this module inspects.

use std::path::Path;

use devac_core::{
    Edge, EdgeKind, EntityId, Effect, EffectHeader, ExternalRef, ImportStyle, Language, Node,
    NodeKind, Visibility,
};
use tree_sitter::Node as TsNode;

use crate::effects;
use crate::parser::{LanguageParser, ParseConfig, ParseOutput, ParseWarning};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct EcmaParser {
    pool: ParserPool,
    file_type: FileType,
    language: Language,
    extensions: &'static [&'static str],
    version: &'static str,
}

impl EcmaParser {
    pub fn javascript(pool: ParserPool) -> Self {
        Self {
            pool,
            file_type: FileType::JavaScript,
            language: Language::JavaScript,
            extensions: &["js", "jsx", "mjs", "cjs"],
            version: "tree-sitter-javascript 0.23",
        }
    }

    pub fn typescript(pool: ParserPool) -> Self {
        Self {
            pool,
            file_type: FileType::TypeScript,
            language: Language::TypeScript,
            extensions: &["ts", "tsx"],
            version: "tree-sitter-typescript 0.23",
        }
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
    module_entity: EntityId,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    external_refs: Vec<ExternalRef>,
    effects: Vec<Effect>,
    warnings: Vec<ParseWarning>,
    route_prefix: Option<String>,
}

impl<'a> Walker<'a> {
    /// `decorator` nodes are direct children of `class_declaration`/
    /// `method_definition` per tree-sitter-typescript's grammar, unlike
    /// Python's wrapper-node shape.
    fn decorators_of(node: TsNode, source: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "decorator" {
                if let Ok(text) = child.utf8_text(source) {
                    out.push(text.trim_start_matches('@').trim().to_string());
                }
            }
        }
        out
    }

    /// Splits `Controller('users')` into `("Controller", Some("users"))`.
    fn decorator_name_and_arg(decorator: &str) -> (String, Option<String>) {
        let name_end = decorator.find(['(', '<']).unwrap_or(decorator.len());
        let name = decorator[..name_end].trim().to_string();
        let arg = decorator
            .find('(')
            .and_then(|start| decorator[start + 1..].split(')').next())
            .map(|inner| inner.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string())
            .filter(|s| !s.is_empty());
        (name, arg)
    }

    fn join_route(prefix: Option<&str>, suffix: Option<&str>) -> String {
        let prefix = prefix.unwrap_or("").trim_end_matches('/');
        let suffix = suffix.unwrap_or("");
        if prefix.is_empty() {
            if suffix.is_empty() { "/".to_string() } else { suffix.to_string() }
        } else if suffix.is_empty() {
            prefix.to_string()
        } else {
            format!("{}/{}", prefix, suffix.trim_start_matches('/'))
        }
    }

    fn ident_name(node: TsNode, source: &[u8]) -> Option<String> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "identifier" || child.kind() == "type_identifier" {
                if let Ok(text) = child.utf8_text(source) {
                    return Some(text.to_string());
                }
            }
        }
        None
    }

    fn make_node(
        &self,
        id: EntityId,
        name: &str,
        qualified_name: String,
        kind: NodeKind,
        node: TsNode,
        is_container: bool,
        is_async: bool,
        is_default_export: bool,
    ) -> Node {
        let mut n = Node {
            entity_id: id,
            name: name.to_string(),
            qualified_name,
            kind,
            file_path: self.relative_path.clone().into(),
            start_line: EcmaParser::line(node.start_position()),
            start_col: node.start_position().column as u32,
            end_line: EcmaParser::line(node.end_position()),
            end_col: node.end_position().column as u32,
            is_exported: true,
            is_default_export,
            visibility: Visibility::Public,
            is_async,
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

    fn walk(&mut self, node: TsNode, source: &[u8], scope: &[&str], container_id: &EntityId) {
        match node.kind() {
            "function_declaration" | "method_definition" => {
                if let Some(name) = Self::ident_name(node, source) {
                    let kind = if node.kind() == "method_definition" { NodeKind::Method } else { NodeKind::Function };
                    let is_async = node
                        .child(0)
                        .map(|c| c.kind() == "async")
                        .unwrap_or(false);
                    let id = EcmaParser::entity_id(self.config, &self.relative_path, kind, scope, &name);
                    let qualified = if scope.is_empty() {
                        format!("{}::{}", self.relative_path, name)
                    } else {
                        format!("{}::{}::{}", self.relative_path, scope.join("::"), name)
                    };
                    let n = self.make_node(id.clone(), &name, qualified, kind, node, false, is_async, false);
                    self.nodes.push(n);
                    self.edges.push(Edge {
                        source_entity_id: container_id.clone(),
                        target_entity_id: id.clone(),
                        edge_type: EdgeKind::Contains,
                        source_line: EcmaParser::line(node.start_position()),
                        source_col: 0,
                        properties: Default::default(),
                    });
                    if node.kind() == "method_definition" {
                        self.record_route_effect(node, source, &id, self.route_prefix.clone());
                    }
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk_calls(body, source, &id);
                        let mut new_scope: Vec<&str> = scope.to_vec();
                        new_scope.push(&name);
                        self.walk(body, source, &new_scope, &id);
                    }
                    return;
                }
            }
            "class_declaration" => {
                if let Some(name) = Self::ident_name(node, source) {
                    let id = EcmaParser::entity_id(self.config, &self.relative_path, NodeKind::Class, scope, &name);
                    let qualified = format!("{}::{}", self.relative_path, name);
                    let n = self.make_node(id.clone(), &name, qualified, NodeKind::Class, node, true, false, false);
                    self.nodes.push(n);
                    self.edges.push(Edge {
                        source_entity_id: container_id.clone(),
                        target_entity_id: id.clone(),
                        edge_type: EdgeKind::Contains,
                        source_line: EcmaParser::line(node.start_position()),
                        source_col: 0,
                        properties: Default::default(),
                    });
                    if let Some(heritage) = node.child_by_field_name("class_heritage") {
                        if let Ok(text) = heritage.utf8_text(source) {
                            if let Some(parent_name) = text.trim_start_matches("extends").split_whitespace().next() {
                                self.edges.push(Edge {
                                    source_entity_id: id.clone(),
                                    target_entity_id: EntityId::unresolved(parent_name),
                                    edge_type: EdgeKind::Extends,
                                    source_line: EcmaParser::line(heritage.start_position()),
                                    source_col: 0,
                                    properties: Default::default(),
                                });
                            }
                        }
                    }
                    let mut class_prefix = None;
                    for decorator in Self::decorators_of(node, source) {
                        let (dec_name, dec_arg) = Self::decorator_name_and_arg(&decorator);
                        if effects::ROUTE_CLASS_DECORATORS.contains(&dec_name.as_str()) {
                            class_prefix = Some(dec_arg.unwrap_or_default());
                        }
                    }
                    if let Some(body) = node.child_by_field_name("body") {
                        let previous_prefix = self.route_prefix.clone();
                        if class_prefix.is_some() {
                            self.route_prefix = class_prefix;
                        }
                        let mut new_scope: Vec<&str> = scope.to_vec();
                        new_scope.push(&name);
                        self.walk(body, source, &new_scope, &id);
                        self.route_prefix = previous_prefix;
                    }
                    return;
                }
            }
            "import_statement" => {
                self.record_import(node, source);
                return;
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, source, scope, container_id);
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
            source_line: EcmaParser::line(node.start_position()),
            source_col: node.start_position().column as u32,
            properties: props,
        });

        let effect_id = format!("{}:{}:{}", self.relative_path, node.start_position().row, callee);
        let header = EffectHeader {
            effect_id,
            source_entity_id: source_entity.clone(),
            source_file_path: self.relative_path.clone().into(),
            source_line: EcmaParser::line(node.start_position()),
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
                    let target = target.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string();
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

    fn record_route_effect(&mut self, node: TsNode, source: &[u8], source_entity: &EntityId, prefix: Option<String>) {
        for decorator in Self::decorators_of(node, source) {
            let (dec_name, dec_arg) = Self::decorator_name_and_arg(&decorator);
            let Some((_, method)) = effects::ROUTE_METHOD_DECORATORS
                .iter()
                .find(|(name, _)| *name == dec_name.as_str())
            else {
                continue;
            };
            let route_pattern = Self::join_route(prefix.as_deref(), dec_arg.as_deref());
            let effect_id = format!("{}:{}:route", self.relative_path, node.start_position().row);
            let header = EffectHeader {
                effect_id,
                source_entity_id: source_entity.clone(),
                source_file_path: self.relative_path.clone().into(),
                source_line: EcmaParser::line(node.start_position()),
                source_col: node.start_position().column as u32,
                is_deleted: false,
            };
            self.effects.push(Effect::Request {
                header,
                method: method.to_string(),
                route_pattern,
                framework: "decorator".to_string(),
            });
        }
    }

    fn record_import(&mut self, node: TsNode, source: &[u8]) {
        let Some(source_node) = node.child_by_field_name("source") else { return };
        let Ok(raw) = source_node.utf8_text(source) else { return };
        let module = raw.trim_matches('"').trim_matches('\'').to_string();

        let Some(clause) = node.child_by_field_name("import_clause") else {
            self.external_refs.push(ExternalRef {
                source_entity_id: self.module_entity.clone(),
                source_file_path: self.relative_path.clone().into(),
                module_specifier: module.clone(),
                imported_symbol: module,
                local_alias: None,
                is_type_only: false,
                is_default: false,
                is_namespace: false,
                import_style: ImportStyle::SideEffect,
                is_reexport: false,
            });
            return;
        };

        let mut cursor = clause.walk();
        let mut saw_named = false;
        for child in clause.children(&mut cursor) {
            match child.kind() {
                "identifier" => {
                    if let Ok(name) = child.utf8_text(source) {
                        self.external_refs.push(ExternalRef {
                            source_entity_id: self.module_entity.clone(),
                            source_file_path: self.relative_path.clone().into(),
                            module_specifier: module.clone(),
                            imported_symbol: name.to_string(),
                            local_alias: None,
                            is_type_only: false,
                            is_default: true,
                            is_namespace: false,
                            import_style: ImportStyle::Default,
                            is_reexport: false,
                        });
                    }
                }
                "namespace_import" => {
                    if let Ok(text) = child.utf8_text(source) {
                        let alias = text.trim_start_matches('*').trim_start_matches("as").trim();
                        self.external_refs.push(ExternalRef {
                            source_entity_id: self.module_entity.clone(),
                            source_file_path: self.relative_path.clone().into(),
                            module_specifier: module.clone(),
                            imported_symbol: module.clone(),
                            local_alias: Some(alias.to_string()),
                            is_type_only: false,
                            is_default: false,
                            is_namespace: true,
                            import_style: ImportStyle::Namespace,
                            is_reexport: false,
                        });
                    }
                }
                "named_imports" => {
                    saw_named = true;
                    let mut inner = child.walk();
                    for spec in child.children(&mut inner) {
                        if spec.kind() == "import_specifier" {
                            if let Ok(text) = spec.utf8_text(source) {
                                self.external_refs.push(ExternalRef {
                                    source_entity_id: self.module_entity.clone(),
                                    source_file_path: self.relative_path.clone().into(),
                                    module_specifier: module.clone(),
                                    imported_symbol: text.to_string(),
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
                }
                _ => {}
            }
        }
        let _ = saw_named;
    }
}

impl LanguageParser for EcmaParser {
    fn language(&self) -> Language {
        self.language
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn parse_content(&self, content: &[u8], path: &Path, config: &ParseConfig) -> anyhow::Result<ParseOutput> {
        let start = std::time::Instant::now();
        let source_code = std::str::from_utf8(content)?;
        let relative_path = path.to_string_lossy().to_string();
        let source_hash = devac_core::content_hash(content);

        let request = ParseRequest {
            file_type: self.file_type,
            content: source_code.to_string(),
            path: path.to_path_buf(),
        };
        let parsed = self.pool.parse_blocking(request)?;

        let module_id = EcmaParser::entity_id(config, &relative_path, NodeKind::Module, &[], "<module>");
        let module_node = Node {
            entity_id: module_id.clone(),
            name: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
            qualified_name: relative_path.clone(),
            kind: NodeKind::Module,
            file_path: relative_path.clone().into(),
            start_line: 1,
            start_col: 0,
            end_line: EcmaParser::line(parsed.tree.root_node().end_position()),
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
            module_entity: module_id.clone(),
            nodes: vec![module_node],
            edges: Vec::new(),
            external_refs: Vec::new(),
            effects: Vec::new(),
            warnings: Vec::new(),
            route_prefix: None,
        };

        if parsed.tree.root_node().has_error() {
            walker.warnings.push(ParseWarning {
                message: "syntax error in file; continuing with best-effort AST".to_string(),
                line: None,
            });
        }

        walker.walk(parsed.tree.root_node(), source_code.as_bytes(), &[], &module_id);

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
    fn extracts_class_and_methods() {
        let parser = EcmaParser::javascript(create_parser_pool());
        let source = b"import React from 'react';\nclass User {\n  getName() {\n    return this.name;\n  }\n}\nfunction createUser(name) {\n  return new User(name);\n}\n";
        let config = ParseConfig { repo_name: "r".into(), package_path: "pkg".into(), ..Default::default() };
        let out = parser.parse_content(source, Path::new("src/a.js"), &config).unwrap();

        assert!(out.nodes.iter().any(|n| n.name == "User" && n.kind == NodeKind::Class));
        assert!(out.nodes.iter().any(|n| n.name == "createUser" && n.kind == NodeKind::Function));
        assert_eq!(out.external_refs.len(), 1);
        assert!(out.external_refs[0].is_default);
    }

    #[test]
    fn records_request_effect_from_route_decorators() {
        let parser = EcmaParser::typescript(create_parser_pool());
        let source = b"@Controller('users')\nclass UserController {\n  @Get(':id')\n  getUser() {\n    return null;\n  }\n}\n";
        let config = ParseConfig { repo_name: "r".into(), package_path: "pkg".into(), ..Default::default() };
        let out = parser.parse_content(source, Path::new("src/user.controller.ts"), &config).unwrap();

        assert!(out.effects.iter().any(|e| matches!(
            e,
            Effect::Request { method, route_pattern, .. }
                if method == "GET" && route_pattern == "users/:id"
        )));
    }
}
