//! Programmatic readback of a package's seed tables, for callers that need
//! `Vec<Node>`/`Vec<Edge>` rather than SQL (the incremental update manager's
//! merge step). Ad-hoc querying goes through [`crate::query`] instead.

use std::fs::File;

use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use devac_core::{DevacError, Edge, Effect, ExternalRef, Node};

use crate::layout::{SeedLayout, Table};
use crate::meta::{SeedMeta, SeedStats};
use crate::schema;

pub struct SeedReader {
    layout: SeedLayout,
}

impl SeedReader {
    pub fn new(layout: SeedLayout) -> Self {
        Self { layout }
    }

    fn read_batches(&self, table: Table) -> anyhow::Result<Vec<RecordBatch>> {
        let path = self.layout.table_path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let mut out = Vec::new();
        for batch in reader {
            out.push(batch?);
        }
        Ok(out)
    }

    pub fn read_nodes(&self) -> anyhow::Result<Vec<Node>> {
        let mut out = Vec::new();
        for batch in self.read_batches(Table::Nodes)? {
            out.extend(schema::batch_to_nodes(&batch)?);
        }
        Ok(out)
    }

    pub fn read_edges(&self) -> anyhow::Result<Vec<Edge>> {
        let mut out = Vec::new();
        for batch in self.read_batches(Table::Edges)? {
            out.extend(schema::batch_to_edges(&batch)?);
        }
        Ok(out)
    }

    pub fn read_external_refs(&self) -> anyhow::Result<Vec<ExternalRef>> {
        let mut out = Vec::new();
        for batch in self.read_batches(Table::ExternalRefs)? {
            out.extend(schema::batch_to_external_refs(&batch)?);
        }
        Ok(out)
    }

    /// Empty (not an error) when the language backends that produced this
    /// package's package never extract effects.
    pub fn read_effects(&self) -> anyhow::Result<Vec<Effect>> {
        let mut out = Vec::new();
        for batch in self.read_batches(Table::Effects)? {
            out.extend(schema::batch_to_effects(&batch)?);
        }
        Ok(out)
    }

    pub fn read_meta(&self) -> Result<Option<SeedMeta>, DevacError> {
        let path = self.layout.meta_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|e| DevacError::Storage(e.to_string()))?;
        let meta: SeedMeta = serde_json::from_slice(&bytes).map_err(|e| DevacError::Storage(e.to_string()))?;
        if !meta.is_compatible() {
            return Err(DevacError::Storage(format!(
                "seed schema version {} is incompatible with supported version",
                meta.schema_version
            )));
        }
        Ok(Some(meta))
    }

    pub fn read_stats(&self) -> anyhow::Result<Option<SeedStats>> {
        let path = self.layout.stats_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&std::fs::read(&path)?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SeedWriter;
    use devac_core::{EntityId, NodeKind, Visibility};
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
    fn round_trips_nodes_through_parquet() {
        let dir = tempdir().unwrap();
        let layout = SeedLayout::new(dir.path(), "base");
        SeedWriter::new(layout.clone()).write_all(&[sample_node()], &[], &[], None, 1).unwrap();

        let reader = SeedReader::new(layout);
        let nodes = reader.read_nodes().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "foo");
        assert!(reader.read_effects().unwrap().is_empty());
        assert!(reader.read_meta().unwrap().is_some());
    }
}
