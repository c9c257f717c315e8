//! Arrow schemas for the four seed tables, and the `Node`/`Edge`/
//! `ExternalRef`/`Effect` <-> `RecordBatch` conversions the writer and
//! reader share.
//!
//! `Effect` is adjacently-tagged in its `serde` form; here it is flattened
//! into one wide nullable-column table, as `devac_core::model::Effect`'s
//! own doc comment specifies.

use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, BooleanBuilder, StringArray, StringBuilder, UInt32Array, UInt32Builder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use devac_core::{Edge, EdgeKind, Effect, EntityId, ExternalRef, ImportStyle, Node, NodeKind, SendType, Visibility};

pub fn nodes_schema() -> Schema {
    Schema::new(vec![
        Field::new("entity_id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("qualified_name", DataType::Utf8, false),
        Field::new("kind", DataType::Utf8, false),
        Field::new("file_path", DataType::Utf8, false),
        Field::new("start_line", DataType::UInt32, false),
        Field::new("start_col", DataType::UInt32, false),
        Field::new("end_line", DataType::UInt32, false),
        Field::new("end_col", DataType::UInt32, false),
        Field::new("is_exported", DataType::Boolean, false),
        Field::new("is_default_export", DataType::Boolean, false),
        Field::new("visibility", DataType::Utf8, false),
        Field::new("is_async", DataType::Boolean, false),
        Field::new("is_generator", DataType::Boolean, false),
        Field::new("is_static", DataType::Boolean, false),
        Field::new("is_abstract", DataType::Boolean, false),
        Field::new("type_signature", DataType::Utf8, true),
        Field::new("documentation", DataType::Utf8, true),
        Field::new("decorators", DataType::Utf8, false),
        Field::new("type_parameters", DataType::Utf8, false),
        Field::new("properties", DataType::Utf8, false),
        Field::new("source_file_hash", DataType::Utf8, false),
        Field::new("branch", DataType::Utf8, false),
        Field::new("is_deleted", DataType::Boolean, false),
        Field::new("updated_at", DataType::Utf8, false),
    ])
}

pub fn edges_schema() -> Schema {
    Schema::new(vec![
        Field::new("source_entity_id", DataType::Utf8, false),
        Field::new("target_entity_id", DataType::Utf8, false),
        Field::new("edge_type", DataType::Utf8, false),
        Field::new("source_line", DataType::UInt32, false),
        Field::new("source_col", DataType::UInt32, false),
        Field::new("properties", DataType::Utf8, false),
    ])
}

pub fn external_refs_schema() -> Schema {
    Schema::new(vec![
        Field::new("source_entity_id", DataType::Utf8, false),
        Field::new("source_file_path", DataType::Utf8, false),
        Field::new("module_specifier", DataType::Utf8, false),
        Field::new("imported_symbol", DataType::Utf8, false),
        Field::new("local_alias", DataType::Utf8, true),
        Field::new("is_type_only", DataType::Boolean, false),
        Field::new("is_default", DataType::Boolean, false),
        Field::new("is_namespace", DataType::Boolean, false),
        Field::new("import_style", DataType::Utf8, false),
        Field::new("is_reexport", DataType::Boolean, false),
    ])
}

pub fn effects_schema() -> Schema {
    Schema::new(vec![
        Field::new("effect_type", DataType::Utf8, false),
        Field::new("effect_id", DataType::Utf8, false),
        Field::new("source_entity_id", DataType::Utf8, false),
        Field::new("source_file_path", DataType::Utf8, false),
        Field::new("source_line", DataType::UInt32, false),
        Field::new("source_col", DataType::UInt32, false),
        Field::new("is_deleted", DataType::Boolean, false),
        Field::new("callee_name", DataType::Utf8, true),
        Field::new("is_method_call", DataType::Boolean, true),
        Field::new("is_constructor", DataType::Boolean, true),
        Field::new("is_async", DataType::Boolean, true),
        Field::new("argument_count", DataType::UInt32, true),
        Field::new("is_external", DataType::Boolean, true),
        Field::new("external_module", DataType::Utf8, true),
        Field::new("method", DataType::Utf8, true),
        Field::new("route_pattern", DataType::Utf8, true),
        Field::new("framework", DataType::Utf8, true),
        Field::new("send_type", DataType::Utf8, true),
        Field::new("target", DataType::Utf8, true),
        Field::new("service_name", DataType::Utf8, true),
        Field::new("is_third_party", DataType::Boolean, true),
    ])
}

fn kind_str(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Module => "module",
        NodeKind::Class => "class",
        NodeKind::Interface => "interface",
        NodeKind::Function => "function",
        NodeKind::Method => "method",
        NodeKind::Property => "property",
        NodeKind::Constant => "constant",
        NodeKind::Variable => "variable",
        NodeKind::Type => "type",
        NodeKind::Enum => "enum",
        NodeKind::EnumMember => "enum_member",
        NodeKind::Namespace => "namespace",
        NodeKind::HtmlElement => "html_element",
        NodeKind::JsxComponent => "jsx_component",
        NodeKind::Unknown => "unknown",
    }
}

fn kind_from_str(s: &str) -> NodeKind {
    match s {
        "module" => NodeKind::Module,
        "class" => NodeKind::Class,
        "interface" => NodeKind::Interface,
        "function" => NodeKind::Function,
        "method" => NodeKind::Method,
        "property" => NodeKind::Property,
        "constant" => NodeKind::Constant,
        "variable" => NodeKind::Variable,
        "type" => NodeKind::Type,
        "enum" => NodeKind::Enum,
        "enum_member" => NodeKind::EnumMember,
        "namespace" => NodeKind::Namespace,
        "html_element" => NodeKind::HtmlElement,
        "jsx_component" => NodeKind::JsxComponent,
        _ => NodeKind::Unknown,
    }
}

fn visibility_str(v: Visibility) -> &'static str {
    match v {
        Visibility::Public => "public",
        Visibility::Protected => "protected",
        Visibility::Private => "private",
        Visibility::Internal => "internal",
    }
}

fn visibility_from_str(s: &str) -> Visibility {
    match s {
        "protected" => Visibility::Protected,
        "private" => Visibility::Private,
        "internal" => Visibility::Internal,
        _ => Visibility::Public,
    }
}

fn edge_kind_str(k: EdgeKind) -> &'static str {
    match k {
        EdgeKind::Contains => "CONTAINS",
        EdgeKind::Extends => "EXTENDS",
        EdgeKind::Implements => "IMPLEMENTS",
        EdgeKind::Calls => "CALLS",
        EdgeKind::Imports => "IMPORTS",
        EdgeKind::References => "REFERENCES",
        EdgeKind::Overrides => "OVERRIDES",
    }
}

fn edge_kind_from_str(s: &str) -> EdgeKind {
    match s {
        "EXTENDS" => EdgeKind::Extends,
        "IMPLEMENTS" => EdgeKind::Implements,
        "CALLS" => EdgeKind::Calls,
        "IMPORTS" => EdgeKind::Imports,
        "REFERENCES" => EdgeKind::References,
        "OVERRIDES" => EdgeKind::Overrides,
        _ => EdgeKind::Contains,
    }
}

fn import_style_str(s: ImportStyle) -> &'static str {
    match s {
        ImportStyle::Named => "named",
        ImportStyle::Default => "default",
        ImportStyle::Namespace => "namespace",
        ImportStyle::SideEffect => "side_effect",
        ImportStyle::Dynamic => "dynamic",
        ImportStyle::Reexport => "reexport",
    }
}

fn import_style_from_str(s: &str) -> ImportStyle {
    match s {
        "default" => ImportStyle::Default,
        "namespace" => ImportStyle::Namespace,
        "side_effect" => ImportStyle::SideEffect,
        "dynamic" => ImportStyle::Dynamic,
        "reexport" => ImportStyle::Reexport,
        _ => ImportStyle::Named,
    }
}

fn send_type_str(s: SendType) -> &'static str {
    match s {
        SendType::Http => "http",
        SendType::M2m => "m2m",
    }
}

fn send_type_from_str(s: &str) -> SendType {
    match s {
        "m2m" => SendType::M2m,
        _ => SendType::Http,
    }
}

pub fn nodes_to_batch(nodes: &[Node]) -> anyhow::Result<RecordBatch> {
    let mut entity_id = StringBuilder::new();
    let mut name = StringBuilder::new();
    let mut qualified_name = StringBuilder::new();
    let mut kind = StringBuilder::new();
    let mut file_path = StringBuilder::new();
    let mut start_line = UInt32Builder::new();
    let mut start_col = UInt32Builder::new();
    let mut end_line = UInt32Builder::new();
    let mut end_col = UInt32Builder::new();
    let mut is_exported = BooleanBuilder::new();
    let mut is_default_export = BooleanBuilder::new();
    let mut visibility = StringBuilder::new();
    let mut is_async = BooleanBuilder::new();
    let mut is_generator = BooleanBuilder::new();
    let mut is_static = BooleanBuilder::new();
    let mut is_abstract = BooleanBuilder::new();
    let mut type_signature = StringBuilder::new();
    let mut documentation = StringBuilder::new();
    let mut decorators = StringBuilder::new();
    let mut type_parameters = StringBuilder::new();
    let mut properties = StringBuilder::new();
    let mut source_file_hash = StringBuilder::new();
    let mut branch = StringBuilder::new();
    let mut is_deleted = BooleanBuilder::new();
    let mut updated_at = StringBuilder::new();

    for n in nodes {
        entity_id.append_value(&n.entity_id.0);
        name.append_value(&n.name);
        qualified_name.append_value(&n.qualified_name);
        kind.append_value(kind_str(n.kind));
        file_path.append_value(n.file_path.to_string_lossy());
        start_line.append_value(n.start_line);
        start_col.append_value(n.start_col);
        end_line.append_value(n.end_line);
        end_col.append_value(n.end_col);
        is_exported.append_value(n.is_exported);
        is_default_export.append_value(n.is_default_export);
        visibility.append_value(visibility_str(n.visibility));
        is_async.append_value(n.is_async);
        is_generator.append_value(n.is_generator);
        is_static.append_value(n.is_static);
        is_abstract.append_value(n.is_abstract);
        type_signature.append_option(n.type_signature.as_deref());
        documentation.append_option(n.documentation.as_deref());
        decorators.append_value(serde_json::to_string(&n.decorators)?);
        type_parameters.append_value(serde_json::to_string(&n.type_parameters)?);
        properties.append_value(serde_json::to_string(&n.properties)?);
        source_file_hash.append_value(&n.source_file_hash);
        branch.append_value(&n.branch);
        is_deleted.append_value(n.is_deleted);
        updated_at.append_value(n.updated_at.to_rfc3339());
    }

    Ok(RecordBatch::try_new(
        Arc::new(nodes_schema()),
        vec![
            Arc::new(entity_id.finish()),
            Arc::new(name.finish()),
            Arc::new(qualified_name.finish()),
            Arc::new(kind.finish()),
            Arc::new(file_path.finish()),
            Arc::new(start_line.finish()),
            Arc::new(start_col.finish()),
            Arc::new(end_line.finish()),
            Arc::new(end_col.finish()),
            Arc::new(is_exported.finish()),
            Arc::new(is_default_export.finish()),
            Arc::new(visibility.finish()),
            Arc::new(is_async.finish()),
            Arc::new(is_generator.finish()),
            Arc::new(is_static.finish()),
            Arc::new(is_abstract.finish()),
            Arc::new(type_signature.finish()),
            Arc::new(documentation.finish()),
            Arc::new(decorators.finish()),
            Arc::new(type_parameters.finish()),
            Arc::new(properties.finish()),
            Arc::new(source_file_hash.finish()),
            Arc::new(branch.finish()),
            Arc::new(is_deleted.finish()),
            Arc::new(updated_at.finish()),
        ],
    )?)
}

pub fn batch_to_nodes(batch: &RecordBatch) -> anyhow::Result<Vec<Node>> {
    let col = |i: usize| -> &StringArray { batch.column(i).as_any().downcast_ref().unwrap() };
    let bool_col = |i: usize| -> &BooleanArray { batch.column(i).as_any().downcast_ref().unwrap() };
    let u32_col = |i: usize| -> &UInt32Array { batch.column(i).as_any().downcast_ref().unwrap() };

    let entity_id = col(0);
    let name = col(1);
    let qualified_name = col(2);
    let kind = col(3);
    let file_path = col(4);
    let start_line = u32_col(5);
    let start_col = u32_col(6);
    let end_line = u32_col(7);
    let end_col = u32_col(8);
    let is_exported = bool_col(9);
    let is_default_export = bool_col(10);
    let visibility = col(11);
    let is_async = bool_col(12);
    let is_generator = bool_col(13);
    let is_static = bool_col(14);
    let is_abstract = bool_col(15);
    let type_signature = col(16);
    let documentation = col(17);
    let decorators = col(18);
    let type_parameters = col(19);
    let properties = col(20);
    let source_file_hash = col(21);
    let branch = col(22);
    let is_deleted = bool_col(23);
    let updated_at = col(24);

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        out.push(Node {
            entity_id: EntityId(entity_id.value(i).to_string()),
            name: name.value(i).to_string(),
            qualified_name: qualified_name.value(i).to_string(),
            kind: kind_from_str(kind.value(i)),
            file_path: PathBuf::from(file_path.value(i)),
            start_line: start_line.value(i),
            start_col: start_col.value(i),
            end_line: end_line.value(i),
            end_col: end_col.value(i),
            is_exported: is_exported.value(i),
            is_default_export: is_default_export.value(i),
            visibility: visibility_from_str(visibility.value(i)),
            is_async: is_async.value(i),
            is_generator: is_generator.value(i),
            is_static: is_static.value(i),
            is_abstract: is_abstract.value(i),
            type_signature: (!type_signature.is_null(i)).then(|| type_signature.value(i).to_string()),
            documentation: (!documentation.is_null(i)).then(|| documentation.value(i).to_string()),
            decorators: serde_json::from_str(decorators.value(i))?,
            type_parameters: serde_json::from_str(type_parameters.value(i))?,
            properties: serde_json::from_str(properties.value(i))?,
            source_file_hash: source_file_hash.value(i).to_string(),
            branch: branch.value(i).to_string(),
            is_deleted: is_deleted.value(i),
            updated_at: chrono::DateTime::parse_from_rfc3339(updated_at.value(i))?.with_timezone(&chrono::Utc),
        });
    }
    Ok(out)
}

pub fn edges_to_batch(edges: &[Edge]) -> anyhow::Result<RecordBatch> {
    let mut source_entity_id = StringBuilder::new();
    let mut target_entity_id = StringBuilder::new();
    let mut edge_type = StringBuilder::new();
    let mut source_line = UInt32Builder::new();
    let mut source_col = UInt32Builder::new();
    let mut properties = StringBuilder::new();

    for e in edges {
        source_entity_id.append_value(&e.source_entity_id.0);
        target_entity_id.append_value(&e.target_entity_id.0);
        edge_type.append_value(edge_kind_str(e.edge_type));
        source_line.append_value(e.source_line);
        source_col.append_value(e.source_col);
        properties.append_value(serde_json::to_string(&e.properties)?);
    }

    Ok(RecordBatch::try_new(
        Arc::new(edges_schema()),
        vec![
            Arc::new(source_entity_id.finish()),
            Arc::new(target_entity_id.finish()),
            Arc::new(edge_type.finish()),
            Arc::new(source_line.finish()),
            Arc::new(source_col.finish()),
            Arc::new(properties.finish()),
        ],
    )?)
}

pub fn batch_to_edges(batch: &RecordBatch) -> anyhow::Result<Vec<Edge>> {
    let col = |i: usize| -> &StringArray { batch.column(i).as_any().downcast_ref().unwrap() };
    let u32_col = |i: usize| -> &UInt32Array { batch.column(i).as_any().downcast_ref().unwrap() };

    let source_entity_id = col(0);
    let target_entity_id = col(1);
    let edge_type = col(2);
    let source_line = u32_col(3);
    let source_col = u32_col(4);
    let properties = col(5);

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        out.push(Edge {
            source_entity_id: EntityId(source_entity_id.value(i).to_string()),
            target_entity_id: EntityId(target_entity_id.value(i).to_string()),
            edge_type: edge_kind_from_str(edge_type.value(i)),
            source_line: source_line.value(i),
            source_col: source_col.value(i),
            properties: serde_json::from_str(properties.value(i))?,
        });
    }
    Ok(out)
}

pub fn external_refs_to_batch(refs: &[ExternalRef]) -> anyhow::Result<RecordBatch> {
    let mut source_entity_id = StringBuilder::new();
    let mut source_file_path = StringBuilder::new();
    let mut module_specifier = StringBuilder::new();
    let mut imported_symbol = StringBuilder::new();
    let mut local_alias = StringBuilder::new();
    let mut is_type_only = BooleanBuilder::new();
    let mut is_default = BooleanBuilder::new();
    let mut is_namespace = BooleanBuilder::new();
    let mut import_style = StringBuilder::new();
    let mut is_reexport = BooleanBuilder::new();

    for r in refs {
        source_entity_id.append_value(&r.source_entity_id.0);
        source_file_path.append_value(r.source_file_path.to_string_lossy());
        module_specifier.append_value(&r.module_specifier);
        imported_symbol.append_value(&r.imported_symbol);
        local_alias.append_option(r.local_alias.as_deref());
        is_type_only.append_value(r.is_type_only);
        is_default.append_value(r.is_default);
        is_namespace.append_value(r.is_namespace);
        import_style.append_value(import_style_str(r.import_style));
        is_reexport.append_value(r.is_reexport);
    }

    Ok(RecordBatch::try_new(
        Arc::new(external_refs_schema()),
        vec![
            Arc::new(source_entity_id.finish()),
            Arc::new(source_file_path.finish()),
            Arc::new(module_specifier.finish()),
            Arc::new(imported_symbol.finish()),
            Arc::new(local_alias.finish()),
            Arc::new(is_type_only.finish()),
            Arc::new(is_default.finish()),
            Arc::new(is_namespace.finish()),
            Arc::new(import_style.finish()),
            Arc::new(is_reexport.finish()),
        ],
    )?)
}

pub fn batch_to_external_refs(batch: &RecordBatch) -> anyhow::Result<Vec<ExternalRef>> {
    let col = |i: usize| -> &StringArray { batch.column(i).as_any().downcast_ref().unwrap() };
    let bool_col = |i: usize| -> &BooleanArray { batch.column(i).as_any().downcast_ref().unwrap() };

    let source_entity_id = col(0);
    let source_file_path = col(1);
    let module_specifier = col(2);
    let imported_symbol = col(3);
    let local_alias = col(4);
    let is_type_only = bool_col(5);
    let is_default = bool_col(6);
    let is_namespace = bool_col(7);
    let import_style = col(8);
    let is_reexport = bool_col(9);

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        out.push(ExternalRef {
            source_entity_id: EntityId(source_entity_id.value(i).to_string()),
            source_file_path: PathBuf::from(source_file_path.value(i)),
            module_specifier: module_specifier.value(i).to_string(),
            imported_symbol: imported_symbol.value(i).to_string(),
            local_alias: (!local_alias.is_null(i)).then(|| local_alias.value(i).to_string()),
            is_type_only: is_type_only.value(i),
            is_default: is_default.value(i),
            is_namespace: is_namespace.value(i),
            import_style: import_style_from_str(import_style.value(i)),
            is_reexport: is_reexport.value(i),
        });
    }
    Ok(out)
}

pub fn effects_to_batch(effects: &[Effect]) -> anyhow::Result<RecordBatch> {
    let mut effect_type = StringBuilder::new();
    let mut effect_id = StringBuilder::new();
    let mut source_entity_id = StringBuilder::new();
    let mut source_file_path = StringBuilder::new();
    let mut source_line = UInt32Builder::new();
    let mut source_col = UInt32Builder::new();
    let mut is_deleted = BooleanBuilder::new();
    let mut callee_name = StringBuilder::new();
    let mut is_method_call = BooleanBuilder::new();
    let mut is_constructor = BooleanBuilder::new();
    let mut is_async = BooleanBuilder::new();
    let mut argument_count = UInt32Builder::new();
    let mut is_external = BooleanBuilder::new();
    let mut external_module = StringBuilder::new();
    let mut method = StringBuilder::new();
    let mut route_pattern = StringBuilder::new();
    let mut framework = StringBuilder::new();
    let mut send_type = StringBuilder::new();
    let mut target = StringBuilder::new();
    let mut service_name = StringBuilder::new();
    let mut is_third_party = BooleanBuilder::new();

    for e in effects {
        let h = e.header();
        effect_id.append_value(&h.effect_id);
        source_entity_id.append_value(&h.source_entity_id.0);
        source_file_path.append_value(h.source_file_path.to_string_lossy());
        source_line.append_value(h.source_line);
        source_col.append_value(h.source_col);
        is_deleted.append_value(h.is_deleted);

        match e {
            Effect::FunctionCall { callee_name: c, is_method_call: m, is_constructor: ctor, is_async: a, argument_count: n, is_external: ext, external_module: em, .. } => {
                effect_type.append_value("function_call");
                callee_name.append_value(c);
                is_method_call.append_value(*m);
                is_constructor.append_value(*ctor);
                is_async.append_value(*a);
                argument_count.append_value(*n);
                is_external.append_value(*ext);
                external_module.append_option(em.as_deref());
                method.append_null();
                route_pattern.append_null();
                framework.append_null();
                send_type.append_null();
                target.append_null();
                service_name.append_null();
                is_third_party.append_null();
            }
            Effect::Request { method: m, route_pattern: rp, framework: fw, .. } => {
                effect_type.append_value("request");
                callee_name.append_null();
                is_method_call.append_null();
                is_constructor.append_null();
                is_async.append_null();
                argument_count.append_null();
                is_external.append_null();
                external_module.append_null();
                method.append_value(m);
                route_pattern.append_value(rp);
                framework.append_value(fw);
                send_type.append_null();
                target.append_null();
                service_name.append_null();
                is_third_party.append_null();
            }
            Effect::Send { send_type: st, method: m, target: t, service_name: sn, is_third_party: tp, .. } => {
                effect_type.append_value("send");
                callee_name.append_null();
                is_method_call.append_null();
                is_constructor.append_null();
                is_async.append_null();
                argument_count.append_null();
                is_external.append_null();
                external_module.append_null();
                method.append_value(m);
                route_pattern.append_null();
                framework.append_null();
                send_type.append_value(send_type_str(*st));
                target.append_value(t);
                service_name.append_option(sn.as_deref());
                is_third_party.append_value(*tp);
            }
            Effect::Store { target: t, .. } => {
                effect_type.append_value("store");
                callee_name.append_null();
                is_method_call.append_null();
                is_constructor.append_null();
                is_async.append_null();
                argument_count.append_null();
                is_external.append_null();
                external_module.append_null();
                method.append_null();
                route_pattern.append_null();
                framework.append_null();
                send_type.append_null();
                target.append_value(t);
                service_name.append_null();
                is_third_party.append_null();
            }
            Effect::Retrieve { target: t, .. } => {
                effect_type.append_value("retrieve");
                callee_name.append_null();
                is_method_call.append_null();
                is_constructor.append_null();
                is_async.append_null();
                argument_count.append_null();
                is_external.append_null();
                external_module.append_null();
                method.append_null();
                route_pattern.append_null();
                framework.append_null();
                send_type.append_null();
                target.append_value(t);
                service_name.append_null();
                is_third_party.append_null();
            }
        }
    }

    Ok(RecordBatch::try_new(
        Arc::new(effects_schema()),
        vec![
            Arc::new(effect_type.finish()),
            Arc::new(effect_id.finish()),
            Arc::new(source_entity_id.finish()),
            Arc::new(source_file_path.finish()),
            Arc::new(source_line.finish()),
            Arc::new(source_col.finish()),
            Arc::new(is_deleted.finish()),
            Arc::new(callee_name.finish()),
            Arc::new(is_method_call.finish()),
            Arc::new(is_constructor.finish()),
            Arc::new(is_async.finish()),
            Arc::new(argument_count.finish()),
            Arc::new(is_external.finish()),
            Arc::new(external_module.finish()),
            Arc::new(method.finish()),
            Arc::new(route_pattern.finish()),
            Arc::new(framework.finish()),
            Arc::new(send_type.finish()),
            Arc::new(target.finish()),
            Arc::new(service_name.finish()),
            Arc::new(is_third_party.finish()),
        ],
    )?)
}

pub fn batch_to_effects(batch: &RecordBatch) -> anyhow::Result<Vec<Effect>> {
    use devac_core::EffectHeader;

    let col = |i: usize| -> &StringArray { batch.column(i).as_any().downcast_ref().unwrap() };
    let bool_col = |i: usize| -> &BooleanArray { batch.column(i).as_any().downcast_ref().unwrap() };
    let u32_col = |i: usize| -> &UInt32Array { batch.column(i).as_any().downcast_ref().unwrap() };

    let effect_type = col(0);
    let effect_id = col(1);
    let source_entity_id = col(2);
    let source_file_path = col(3);
    let source_line = u32_col(4);
    let source_col = u32_col(5);
    let is_deleted = bool_col(6);
    let callee_name = col(7);
    let is_method_call = bool_col(8);
    let is_constructor = bool_col(9);
    let is_async = bool_col(10);
    let argument_count = u32_col(11);
    let is_external = bool_col(12);
    let external_module = col(13);
    let method = col(14);
    let route_pattern = col(15);
    let framework = col(16);
    let send_type_col = col(17);
    let target = col(18);
    let service_name = col(19);
    let is_third_party = bool_col(20);

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let header = EffectHeader {
            effect_id: effect_id.value(i).to_string(),
            source_entity_id: EntityId(source_entity_id.value(i).to_string()),
            source_file_path: PathBuf::from(source_file_path.value(i)),
            source_line: source_line.value(i),
            source_col: source_col.value(i),
            is_deleted: is_deleted.value(i),
        };

        let effect = match effect_type.value(i) {
            "function_call" => Effect::FunctionCall {
                header,
                callee_name: callee_name.value(i).to_string(),
                is_method_call: is_method_call.value(i),
                is_constructor: is_constructor.value(i),
                is_async: is_async.value(i),
                argument_count: argument_count.value(i),
                is_external: is_external.value(i),
                external_module: (!external_module.is_null(i)).then(|| external_module.value(i).to_string()),
            },
            "request" => Effect::Request {
                header,
                method: method.value(i).to_string(),
                route_pattern: route_pattern.value(i).to_string(),
                framework: framework.value(i).to_string(),
            },
            "send" => Effect::Send {
                header,
                send_type: send_type_from_str(send_type_col.value(i)),
                method: method.value(i).to_string(),
                target: target.value(i).to_string(),
                service_name: (!service_name.is_null(i)).then(|| service_name.value(i).to_string()),
                is_third_party: is_third_party.value(i),
            },
            "store" => Effect::Store { header, target: target.value(i).to_string() },
            _ => Effect::Retrieve { header, target: target.value(i).to_string() },
        };
        out.push(effect);
    }
    Ok(out)
}
