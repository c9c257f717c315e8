//! Graph diff computation for incremental updates.
//!
//! `GraphDiff` is the delta type flowing from "what changed when this file
//! was re-parsed" to "what rows need to be merged into the seed tables"
//! (`devac-update`), and its monotonic `sequence` field is reused by the
//! hub's cross-repo-needs NDJSON stream (§6).

use crate::ids::EntityId;
use crate::model::{Edge, Node};

#[derive(Debug, Clone, Default)]
pub struct GraphDiff {
    pub sequence: u64,
    pub added_nodes: Vec<Node>,
    pub removed_nodes: Vec<EntityId>,
    pub added_edges: Vec<Edge>,
    pub removed_edges: Vec<Edge>,
    pub modified_nodes: Vec<Node>,
}

impl GraphDiff {
    pub fn new(sequence: u64) -> Self {
        GraphDiff {
            sequence,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
            && self.modified_nodes.is_empty()
    }
}

/// Tracks a monotonic sequence number across successive diffs for one
/// package.
pub struct DiffEngine {
    sequence: u64,
}

impl DiffEngine {
    pub fn new() -> Self {
        DiffEngine { sequence: 0 }
    }

    /// Compute the row-level difference between the previous and current
    /// parse of a single file: which nodes/edges are new, which vanished,
    /// and which rows were updated in place (identical `entity_id`, changed
    /// content).
    pub fn compute_diff(
        &mut self,
        old_nodes: &[Node],
        new_nodes: &[Node],
        old_edges: &[Edge],
        new_edges: &[Edge],
    ) -> GraphDiff {
        self.sequence += 1;
        let mut diff = GraphDiff::new(self.sequence);

        for new_node in new_nodes {
            match old_nodes.iter().find(|n| n.entity_id == new_node.entity_id) {
                None => diff.added_nodes.push(new_node.clone()),
                Some(old_node) if old_node != new_node => diff.modified_nodes.push(new_node.clone()),
                Some(_) => {}
            }
        }
        for old_node in old_nodes {
            if !new_nodes.iter().any(|n| n.entity_id == old_node.entity_id) {
                diff.removed_nodes.push(old_node.entity_id.clone());
            }
        }

        for new_edge in new_edges {
            if !old_edges.contains(new_edge) {
                diff.added_edges.push(new_edge.clone());
            }
        }
        for old_edge in old_edges {
            if !new_edges.contains(old_edge) {
                diff.removed_edges.push(old_edge.clone());
            }
        }

        diff
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, Visibility};
    use std::path::PathBuf;

    fn node(id: &str) -> Node {
        Node {
            entity_id: EntityId(id.to_string()),
            name: id.to_string(),
            qualified_name: id.to_string(),
            kind: NodeKind::Function,
            file_path: PathBuf::from("a.rs"),
            start_line: 1,
            start_col: 0,
            end_line: 1,
            end_col: 0,
            is_exported: false,
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
            source_file_hash: "h1".into(),
            branch: "base".into(),
            is_deleted: false,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn detects_added_and_removed_nodes() {
        let mut engine = DiffEngine::new();
        let old = vec![node("a")];
        let new = vec![node("a"), node("b")];
        let diff = engine.compute_diff(&old, &new, &[], &[]);
        assert_eq!(diff.added_nodes.len(), 1);
        assert_eq!(diff.removed_nodes.len(), 0);
        assert_eq!(diff.sequence, 1);
    }

    #[test]
    fn detects_modified_node() {
        let mut engine = DiffEngine::new();
        let old = vec![node("a")];
        let mut changed = node("a");
        changed.source_file_hash = "h2".into();
        let diff = engine.compute_diff(&old, &[changed], &[], &[]);
        assert_eq!(diff.modified_nodes.len(), 1);
        assert!(diff.added_nodes.is_empty());
    }
}
