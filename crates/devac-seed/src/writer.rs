//! Atomic per-table parquet writes (§4.4): stage to `<table>.parquet.tmp`,
//! fsync, rename over the live file, guarded by a cooperating advisory lock
//! so two writers in the same package never interleave.

use std::fs::{self, File};
use std::path::Path;

use arrow::record_batch::RecordBatch;
use fs2::FileExt;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use devac_core::{Edge, Effect, ExternalRef, Node};

use crate::layout::{SeedLayout, Table};
use crate::meta::{SeedMeta, SeedStats};
use crate::schema;

pub struct SeedWriter {
    layout: SeedLayout,
}

impl SeedWriter {
    pub fn new(layout: SeedLayout) -> Self {
        Self { layout }
    }

    fn write_batch(&self, table: Table, batch: RecordBatch) -> anyhow::Result<()> {
        fs::create_dir_all(self.layout.branch_dir())?;

        let lock_path = self.layout.lock_path(table);
        let lock_file = File::create(&lock_path)?;
        lock_file.lock_exclusive()?;

        let result = (|| -> anyhow::Result<()> {
            let tmp_path = self.layout.tmp_path(table);
            let tmp_file = File::create(&tmp_path)?;
            let props = WriterProperties::builder().build();
            let mut writer = ArrowWriter::try_new(tmp_file, batch.schema(), Some(props))?;
            writer.write(&batch)?;
            writer.close()?;
            File::open(&tmp_path)?.sync_all()?;
            fs::rename(&tmp_path, self.layout.table_path(table))?;
            Ok(())
        })();

        lock_file.unlock()?;
        result
    }

    pub fn write_nodes(&self, nodes: &[Node]) -> anyhow::Result<()> {
        self.write_batch(Table::Nodes, schema::nodes_to_batch(nodes)?)
    }

    pub fn write_edges(&self, edges: &[Edge]) -> anyhow::Result<()> {
        self.write_batch(Table::Edges, schema::edges_to_batch(edges)?)
    }

    pub fn write_external_refs(&self, refs: &[ExternalRef]) -> anyhow::Result<()> {
        self.write_batch(Table::ExternalRefs, schema::external_refs_to_batch(refs)?)
    }

    /// Effects are optional: languages with no effect extraction never call
    /// this and the table file is simply absent.
    pub fn write_effects(&self, effects: &[Effect]) -> anyhow::Result<()> {
        self.write_batch(Table::Effects, schema::effects_to_batch(effects)?)
    }

    pub fn write_stats(&self, stats: &SeedStats) -> anyhow::Result<()> {
        fs::create_dir_all(self.layout.branch_dir())?;
        let json = serde_json::to_vec_pretty(stats)?;
        atomic_write(&self.layout.stats_path(), &json)
    }

    pub fn write_meta(&self, meta: &SeedMeta) -> anyhow::Result<()> {
        fs::create_dir_all(self.layout.seed_dir())?;
        let json = serde_json::to_vec_pretty(meta)?;
        atomic_write(&self.layout.meta_path(), &json)
    }

    /// Full cold-build write: all four tables plus refreshed meta/stats.
    /// `effects` is `None` for languages without effect extraction, leaving
    /// that table file absent rather than writing an empty one.
    pub fn write_all(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        refs: &[ExternalRef],
        effects: Option<&[Effect]>,
        file_count: usize,
    ) -> anyhow::Result<()> {
        self.write_nodes(nodes)?;
        self.write_edges(edges)?;
        self.write_external_refs(refs)?;
        if let Some(effects) = effects {
            self.write_effects(effects)?;
        }
        self.write_stats(&SeedStats {
            node_count: nodes.len(),
            edge_count: edges.len(),
            ref_count: refs.len(),
            file_count,
        })?;
        self.write_meta(&SeedMeta::current())?;
        Ok(())
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut f = File::create(&tmp)?;
        use std::io::Write as _;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn writes_nodes_table_atomically_and_meta_stats() {
        let dir = tempdir().unwrap();
        let layout = SeedLayout::new(dir.path(), "base");
        let writer = SeedWriter::new(layout.clone());

        writer.write_all(&[sample_node()], &[], &[], None, 1).unwrap();

        assert!(layout.table_path(Table::Nodes).exists());
        assert!(!layout.table_path(Table::Effects).exists());
        assert!(layout.meta_path().exists());
        assert!(layout.stats_path().exists());
        assert!(!layout.tmp_path(Table::Nodes).exists());
    }
}
