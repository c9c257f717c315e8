//! In-memory code graph keyed by content-addressed [`EntityId`].
//!
//! Wraps `petgraph::stable_graph::StableDiGraph` the way the teacher's graph
//! did, but never exposes the petgraph index as a public identifier — the
//! index is an internal implementation detail behind a `HashMap<EntityId,
//! NodeIndex>`, so a node's public identity survives independent of
//! insertion order (P2).

use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::ids::EntityId;
use crate::model::{Edge, EdgeKind, Node};

pub struct Graph {
    inner: StableDiGraph<Node, Edge>,
    index: HashMap<EntityId, NodeIndex>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Insert or overwrite a node. Re-inserting the same `entity_id`
    /// overwrites the row in place rather than creating a duplicate —
    /// matches the lifecycle rule in §3 ("updated on re-parse... identical
    /// entity_id overwrites columns").
    pub fn upsert_node(&mut self, node: Node) -> EntityId {
        let id = node.entity_id.clone();
        if let Some(&idx) = self.index.get(&id) {
            self.inner[idx] = node;
        } else {
            let idx = self.inner.add_node(node);
            self.index.insert(id.clone(), idx);
        }
        id
    }

    /// Add an edge between two known entities. Panics if the source endpoint
    /// is not already present — callers insert nodes before edges, which
    /// matches every parser's node-then-edge emission order.
    pub fn add_edge(&mut self, edge: Edge) {
        let source = self.index[&edge.source_entity_id];
        let target = self.resolve_or_insert_stub(&edge.target_entity_id);
        self.inner.add_edge(source, target, edge);
    }

    /// `unresolved:` targets (and any other as-yet-unseen entity) get a
    /// lazily created placeholder node so the edge can still be stored; the
    /// resolver pass later replaces the edge wholesale once resolution
    /// succeeds.
    fn resolve_or_insert_stub(&mut self, id: &EntityId) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let stub = Node {
            entity_id: id.clone(),
            name: id.as_str().to_string(),
            qualified_name: id.as_str().to_string(),
            kind: crate::model::NodeKind::Unknown,
            file_path: Default::default(),
            start_line: 0,
            start_col: 0,
            end_line: 0,
            end_col: 0,
            is_exported: false,
            is_default_export: false,
            visibility: crate::model::Visibility::Public,
            is_async: false,
            is_generator: false,
            is_static: false,
            is_abstract: false,
            type_signature: None,
            documentation: None,
            decorators: Vec::new(),
            type_parameters: Vec::new(),
            properties: Default::default(),
            source_file_hash: String::new(),
            branch: "base".to_string(),
            is_deleted: false,
            updated_at: chrono::Utc::now(),
        };
        let idx = self.inner.add_node(stub);
        self.index.insert(id.clone(), idx);
        idx
    }

    pub fn node(&self, id: &EntityId) -> Option<&Node> {
        self.index.get(id).and_then(|&idx| self.inner.node_weight(idx))
    }

    pub fn node_mut(&mut self, id: &EntityId) -> Option<&mut Node> {
        let idx = *self.index.get(id)?;
        self.inner.node_weight_mut(idx)
    }

    pub fn remove_node(&mut self, id: &EntityId) -> Option<Node> {
        let idx = self.index.remove(id)?;
        self.inner.remove_node(idx)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner.node_weights()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.inner.edge_weights()
    }

    pub fn edges_from(&self, source: &EntityId) -> impl Iterator<Item = &Edge> {
        let idx = self.index.get(source).copied();
        idx.into_iter().flat_map(move |idx| {
            self.inner
                .edges_directed(idx, Direction::Outgoing)
                .filter_map(move |edge_ref| self.inner.edge_weight(edge_ref.id()))
        })
    }

    pub fn edges_to(&self, target: &EntityId) -> impl Iterator<Item = &Edge> {
        let idx = self.index.get(target).copied();
        idx.into_iter().flat_map(move |idx| {
            self.inner
                .edges_directed(idx, Direction::Incoming)
                .filter_map(move |edge_ref| self.inner.edge_weight(edge_ref.id()))
        })
    }

    pub fn has_edge_between(&self, source: &EntityId, target: &EntityId, kind: EdgeKind) -> bool {
        self.edges_from(source)
            .any(|e| &e.target_entity_id == target && e.edge_type == kind)
    }

    pub fn find_node_by_name(&self, name: &str) -> Option<&Node> {
        self.inner.node_weights().find(|n| n.name == name)
    }

    pub fn find_node_by_qualified(&self, qualified_name: &str) -> Option<&Node> {
        self.inner
            .node_weights()
            .find(|n| n.qualified_name == qualified_name)
    }

    pub fn nodes_of_kind(&self, kind: crate::model::NodeKind) -> impl Iterator<Item = &Node> {
        self.inner.node_weights().filter(move |n| n.kind == kind)
    }

    /// All entities reachable by walking `CONTAINS` edges backwards from
    /// `node` (i.e. its enclosing scopes).
    pub fn ancestors(&self, node: &EntityId) -> HashSet<EntityId> {
        let mut ancestors = HashSet::new();
        let mut to_visit = vec![node.clone()];

        while let Some(current) = to_visit.pop() {
            for edge in self.edges_to(&current) {
                if edge.edge_type == EdgeKind::Contains
                    && !ancestors.contains(&edge.source_entity_id)
                {
                    ancestors.insert(edge.source_entity_id.clone());
                    to_visit.push(edge.source_entity_id.clone());
                }
            }
        }

        ancestors
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, Visibility};
    use std::path::PathBuf;

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            entity_id: EntityId(id.to_string()),
            name: id.to_string(),
            qualified_name: id.to_string(),
            kind,
            file_path: PathBuf::from("test.rs"),
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
            source_file_hash: "h".into(),
            branch: "base".into(),
            is_deleted: false,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn upsert_overwrites_same_entity_id() {
        let mut g = Graph::new();
        g.upsert_node(node("a", NodeKind::Function));
        assert_eq!(g.node_count(), 1);
        let mut updated = node("a", NodeKind::Function);
        updated.is_exported = true;
        g.upsert_node(updated);
        assert_eq!(g.node_count(), 1);
        assert!(g.node(&EntityId("a".into())).unwrap().is_exported);
    }

    #[test]
    fn edges_and_ancestors() {
        let mut g = Graph::new();
        g.upsert_node(node("mod", NodeKind::Module));
        g.upsert_node(node("func", NodeKind::Function));
        g.add_edge(Edge {
            source_entity_id: EntityId("mod".into()),
            target_entity_id: EntityId("func".into()),
            edge_type: EdgeKind::Contains,
            source_line: 1,
            source_col: 0,
            properties: Default::default(),
        });
        assert!(g.has_edge_between(
            &EntityId("mod".into()),
            &EntityId("func".into()),
            EdgeKind::Contains
        ));
        let ancestors = g.ancestors(&EntityId("func".into()));
        assert!(ancestors.contains(&EntityId("mod".into())));
    }

    #[test]
    fn unresolved_edge_creates_stub_node() {
        let mut g = Graph::new();
        g.upsert_node(node("caller", NodeKind::Function));
        g.add_edge(Edge {
            source_entity_id: EntityId("caller".into()),
            target_entity_id: EntityId::unresolved("callee"),
            edge_type: EdgeKind::Calls,
            source_line: 1,
            source_col: 0,
            properties: Default::default(),
        });
        assert_eq!(g.node_count(), 2);
        assert!(g.node(&EntityId::unresolved("callee")).is_some());
    }
}
