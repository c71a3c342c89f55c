use std::collections::HashMap;
use std::sync::Arc;
use txgraph_core::{EdgeId, GraphEdge, GraphNode, GraphQuery, NodeId};

use crate::adapter::DanglingEdgeWarning;

/// Issues the adapter recovered from while building a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDiagnostics {
    pub dangling_edges: Vec<DanglingEdgeWarning>,
    pub duplicate_nodes: Vec<NodeId>,
    pub duplicate_edges: Vec<EdgeId>,
    /// Raw nodes dropped because they had no usable id or were not objects.
    pub malformed_nodes: usize,
    /// Raw edges dropped because they were not objects.
    pub malformed_edges: usize,
    /// Edges folded into another edge under the merge policy.
    pub merged_edges: usize,
}

impl SnapshotDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.dangling_edges.is_empty()
            && self.duplicate_nodes.is_empty()
            && self.duplicate_edges.is_empty()
            && self.malformed_nodes == 0
            && self.malformed_edges == 0
    }
}

#[derive(Debug, Default)]
struct SnapshotInner {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    node_index: HashMap<NodeId, usize>,
    edge_index: HashMap<EdgeId, usize>,
    /// Edge indices incident to each node, by node index.
    incident: Vec<Vec<usize>>,
    diagnostics: SnapshotDiagnostics,
    query: Option<GraphQuery>,
}

/// Immutable node/edge set produced by [`crate::GraphDataAdapter`].
///
/// Cloning is cheap and shares the same data. A new query replaces the
/// snapshot as a whole; nothing mutates one after construction.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    inner: Arc<SnapshotInner>,
}

impl GraphSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Callers guarantee unique node ids, unique edge ids, and that every
    /// edge endpoint exists in `nodes`.
    pub(crate) fn from_validated(
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
        diagnostics: SnapshotDiagnostics,
        query: Option<GraphQuery>,
    ) -> Self {
        let node_index: HashMap<NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.clone(), i))
            .collect();
        let edge_index: HashMap<EdgeId, usize> = edges
            .iter()
            .enumerate()
            .map(|(i, edge)| (edge.id.clone(), i))
            .collect();

        let mut incident = vec![Vec::new(); nodes.len()];
        for (edge_idx, edge) in edges.iter().enumerate() {
            let (Some(&src), Some(&dst)) = (
                node_index.get(&edge.source_id),
                node_index.get(&edge.target_id),
            ) else {
                continue;
            };
            incident[src].push(edge_idx);
            if dst != src {
                incident[dst].push(edge_idx);
            }
        }

        Self {
            inner: Arc::new(SnapshotInner {
                nodes,
                edges,
                node_index,
                edge_index,
                incident,
                diagnostics,
                query,
            }),
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.inner.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.inner.edges
    }

    pub fn node_count(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.inner
            .node_index
            .get(id)
            .map(|&idx| &self.inner.nodes[idx])
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&GraphEdge> {
        self.inner
            .edge_index
            .get(id)
            .map(|&idx| &self.inner.edges[idx])
    }

    pub fn node_position(&self, id: &NodeId) -> Option<usize> {
        self.inner.node_index.get(id).copied()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.inner.node_index.contains_key(id)
    }

    /// Edges with `id` as source or target. Cost is O(degree).
    pub fn incident_edges<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        let list: &'a [usize] = match self.inner.node_index.get(id) {
            Some(&idx) => &self.inner.incident[idx],
            None => &[],
        };
        list.iter().map(move |&edge_idx| &self.inner.edges[edge_idx])
    }

    /// Depth-1 neighbors of `id`. A neighbor reachable through several edges
    /// is yielded once per edge.
    pub fn neighbors<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.incident_edges(id)
            .filter_map(move |edge| edge.other_end(id))
    }

    pub fn degree(&self, id: &NodeId) -> usize {
        self.inner
            .node_index
            .get(id)
            .map(|&idx| self.inner.incident[idx].len())
            .unwrap_or(0)
    }

    pub fn diagnostics(&self) -> &SnapshotDiagnostics {
        &self.inner.diagnostics
    }

    pub fn query(&self) -> Option<&GraphQuery> {
        self.inner.query.as_ref()
    }

    /// Whether both handles refer to the same snapshot instance.
    pub fn same_as(&self, other: &GraphSnapshot) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
