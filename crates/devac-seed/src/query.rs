//! SQL query facade over a package's seed tables, backed by an in-memory
//! `duckdb` connection with each table registered as a lazy view over its
//! parquet file. A package whose tables are absent (no seed written yet) or
//! an optional table missing (no effect extraction for that language) gets
//! an empty view with the right columns rather than a missing-table error.

use std::time::Instant;

use duckdb::Connection;
use serde_json::Value as JsonValue;

use devac_core::DevacError;

use crate::cache::QueryCache;
use crate::layout::{SeedLayout, Table};

#[derive(Clone)]
pub struct QueryResult {
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    pub time_ms: u64,
}

pub struct SeedQueryEngine {
    layout: SeedLayout,
    cache: QueryCache,
}

impl SeedQueryEngine {
    pub fn new(layout: SeedLayout) -> Self {
        Self { layout, cache: QueryCache::new(64) }
    }

    /// Drop every cached result for this package, called after any write.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    pub fn query(&self, sql: &str) -> Result<QueryResult, DevacError> {
        if let Some(cached) = self.cache.get(sql) {
            return Ok(cached);
        }

        let started = Instant::now();
        let conn = Connection::open_in_memory().map_err(|e| DevacError::Storage(e.to_string()))?;
        for table in Table::all() {
            register_view(&conn, &self.layout, table)?;
        }

        let mut stmt = conn.prepare(sql).map_err(|e| DevacError::Storage(format!("query syntax error: {e}")))?;
        let column_names: Vec<String> = stmt.column_names().into_iter().map(|s| s.to_string()).collect();

        let mut rows_out = Vec::new();
        let mut rows = stmt.query([]).map_err(|e| DevacError::Storage(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| DevacError::Storage(e.to_string()))? {
            let mut map = serde_json::Map::new();
            for (i, name) in column_names.iter().enumerate() {
                let value: duckdb::types::Value =
                    row.get(i).map_err(|e| DevacError::Storage(e.to_string()))?;
                map.insert(name.clone(), duckdb_value_to_json(value));
            }
            rows_out.push(map);
        }

        let result = QueryResult {
            row_count: rows_out.len(),
            rows: rows_out,
            time_ms: started.elapsed().as_millis() as u64,
        };
        self.cache.put(sql, &result);
        Ok(result)
    }
}

fn register_view(conn: &Connection, layout: &SeedLayout, table: Table) -> Result<(), DevacError> {
    let path = layout.table_path(table);
    let view = table.view_name();
    let ddl = if path.exists() {
        format!(
            "CREATE VIEW {view} AS SELECT * FROM read_parquet('{}')",
            path.to_string_lossy().replace('\'', "''")
        )
    } else {
        format!("CREATE VIEW {view} AS SELECT {} WHERE 1 = 0", empty_columns(table))
    };
    conn.execute_batch(&ddl).map_err(|e| DevacError::Storage(e.to_string()))
}

fn empty_columns(table: Table) -> String {
    let cols: &[(&str, &str)] = match table {
        Table::Nodes => &[
            ("entity_id", "VARCHAR"), ("name", "VARCHAR"), ("qualified_name", "VARCHAR"),
            ("kind", "VARCHAR"), ("file_path", "VARCHAR"), ("start_line", "UINTEGER"),
            ("start_col", "UINTEGER"), ("end_line", "UINTEGER"), ("end_col", "UINTEGER"),
            ("is_exported", "BOOLEAN"), ("is_default_export", "BOOLEAN"), ("visibility", "VARCHAR"),
            ("is_async", "BOOLEAN"), ("is_generator", "BOOLEAN"), ("is_static", "BOOLEAN"),
            ("is_abstract", "BOOLEAN"), ("type_signature", "VARCHAR"), ("documentation", "VARCHAR"),
            ("decorators", "VARCHAR"), ("type_parameters", "VARCHAR"), ("properties", "VARCHAR"),
            ("source_file_hash", "VARCHAR"), ("branch", "VARCHAR"), ("is_deleted", "BOOLEAN"),
            ("updated_at", "VARCHAR"),
        ],
        Table::Edges => &[
            ("source_entity_id", "VARCHAR"), ("target_entity_id", "VARCHAR"), ("edge_type", "VARCHAR"),
            ("source_line", "UINTEGER"), ("source_col", "UINTEGER"), ("properties", "VARCHAR"),
        ],
        Table::ExternalRefs => &[
            ("source_entity_id", "VARCHAR"), ("source_file_path", "VARCHAR"), ("module_specifier", "VARCHAR"),
            ("imported_symbol", "VARCHAR"), ("local_alias", "VARCHAR"), ("is_type_only", "BOOLEAN"),
            ("is_default", "BOOLEAN"), ("is_namespace", "BOOLEAN"), ("import_style", "VARCHAR"),
            ("is_reexport", "BOOLEAN"),
        ],
        Table::Effects => &[
            ("effect_type", "VARCHAR"), ("effect_id", "VARCHAR"), ("source_entity_id", "VARCHAR"),
            ("source_file_path", "VARCHAR"), ("source_line", "UINTEGER"), ("source_col", "UINTEGER"),
            ("is_deleted", "BOOLEAN"), ("callee_name", "VARCHAR"), ("is_method_call", "BOOLEAN"),
            ("is_constructor", "BOOLEAN"), ("is_async", "BOOLEAN"), ("argument_count", "UINTEGER"),
            ("is_external", "BOOLEAN"), ("external_module", "VARCHAR"), ("method", "VARCHAR"),
            ("route_pattern", "VARCHAR"), ("framework", "VARCHAR"), ("send_type", "VARCHAR"),
            ("target", "VARCHAR"), ("service_name", "VARCHAR"), ("is_third_party", "BOOLEAN"),
        ],
    };
    cols.iter()
        .map(|(name, ty)| format!("CAST(NULL AS {ty}) AS {name}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn duckdb_value_to_json(value: duckdb::types::Value) -> JsonValue {
    use duckdb::types::Value;
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(b),
        Value::TinyInt(i) => JsonValue::from(i),
        Value::SmallInt(i) => JsonValue::from(i),
        Value::Int(i) => JsonValue::from(i),
        Value::BigInt(i) => JsonValue::from(i),
        Value::UTinyInt(i) => JsonValue::from(i),
        Value::USmallInt(i) => JsonValue::from(i),
        Value::UInt(i) => JsonValue::from(i),
        Value::UBigInt(i) => JsonValue::from(i),
        Value::Float(f) => serde_json::Number::from_f64(f as f64).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        Value::Double(f) => serde_json::Number::from_f64(f).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        Value::Text(s) => JsonValue::String(s),
        other => JsonValue::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SeedWriter;
    use devac_core::{EntityId, Node, NodeKind, Visibility};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn sample_node() -> Node {
        Node {
            entity_id: EntityId("e1".into()),
            name: "foo".into(),
            qualified_name: "foo".into(),
            kind: NodeKind::Function,
            file_path: PathBuf::from("src/a.rs"),
            start_line: 1,
            start_col: 0,
            end_line: 2,
            end_col: 1,
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
            source_file_hash: "h1".into(),
            branch: "base".into(),
            is_deleted: false,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn queries_nodes_view_and_empty_effects_view() {
        let dir = tempdir().unwrap();
        let layout = SeedLayout::new(dir.path(), "base");
        SeedWriter::new(layout.clone()).write_all(&[sample_node()], &[], &[], None, 1).unwrap();

        let engine = SeedQueryEngine::new(layout);
        let result = engine.query("SELECT name FROM nodes").unwrap();
        assert_eq!(result.row_count, 1);

        let empty = engine.query("SELECT * FROM effects").unwrap();
        assert_eq!(empty.row_count, 0);
    }
}
