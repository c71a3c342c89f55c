use crate::raw::{RawEdge, RawGraphPayload, RawNode};
use crate::snapshot::{GraphSnapshot, SnapshotDiagnostics};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use txgraph_core::{
    EdgeId, EntityType, GraphEdge, GraphError, GraphNode, GraphQuery, GraphResult, NodeId,
};

pub const DEFAULT_TOTAL_VOLUME_USD: f64 = 0.0;
pub const DEFAULT_CONFIDENCE_SCORE: f64 = 50.0;
pub const DEFAULT_TRANSACTION_COUNT: u64 = 0;

/// How multiple edges between the same ordered node pair are represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParallelEdgePolicy {
    /// Keep every edge; the renderer spreads them apart with curvature.
    #[default]
    Separate,
    /// Collapse into one edge, aggregating amounts and counts.
    Merge,
}

/// An edge dropped because one of its endpoints is not in the node set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingEdgeWarning {
    pub edge: EdgeId,
    pub missing: NodeId,
}

impl From<DanglingEdgeWarning> for GraphError {
    fn from(warning: DanglingEdgeWarning) -> Self {
        GraphError::DanglingEdge {
            edge: warning.edge,
            missing: warning.missing,
        }
    }
}

/// Validates raw payloads into [`GraphSnapshot`]s.
///
/// Fails only when `nodes` is missing or not a list. Every other defect is
/// repaired with defaults or by dropping the offending element, and recorded
/// in [`SnapshotDiagnostics`].
#[derive(Debug, Clone, Default)]
pub struct GraphDataAdapter {
    pub parallel_edges: ParallelEdgePolicy,
}

impl GraphDataAdapter {
    pub fn new(parallel_edges: ParallelEdgePolicy) -> Self {
        Self { parallel_edges }
    }

    pub fn adapt_json_str(&self, json: &str, query: Option<GraphQuery>) -> GraphResult<GraphSnapshot> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| GraphError::DataValidation(format!("payload is not valid JSON: {e}")))?;
        self.adapt_value(&value, query)
    }

    pub fn adapt_value(&self, value: &Value, query: Option<GraphQuery>) -> GraphResult<GraphSnapshot> {
        let Value::Object(map) = value else {
            return Err(GraphError::DataValidation(
                "payload is not an object".to_string(),
            ));
        };

        let mut malformed_nodes = 0;
        let mut malformed_edges = 0;

        let nodes: Vec<RawNode> = match map.get("nodes") {
            None | Some(Value::Null) => {
                return Err(GraphError::DataValidation(
                    "`nodes` field is missing".to_string(),
                ));
            }
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match decode_node(item) {
                    Some(node) => Some(node),
                    None => {
                        malformed_nodes += 1;
                        None
                    }
                })
                .collect(),
            Some(_) => {
                return Err(GraphError::DataValidation(
                    "`nodes` must be a list".to_string(),
                ));
            }
        };

        let edges: Vec<RawEdge> = match map.get("edges") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(fields) => Some(RawEdge::from_map(fields)),
                    other => {
                        tracing::warn!("Dropping edge entry of type {}", value_kind(other));
                        malformed_edges += 1;
                        None
                    }
                })
                .collect(),
            Some(other) => {
                tracing::warn!(
                    "`edges` field is not a list ({}), treating as empty",
                    value_kind(other)
                );
                Vec::new()
            }
        };

        let payload = RawGraphPayload {
            nodes: Some(nodes),
            edges: Some(edges),
        };
        let mut diagnostics = SnapshotDiagnostics {
            malformed_nodes,
            malformed_edges,
            ..Default::default()
        };
        let (nodes, edges) = self.build(payload, &mut diagnostics)?;
        Ok(GraphSnapshot::from_validated(nodes, edges, diagnostics, query))
    }

    pub fn adapt(&self, payload: RawGraphPayload, query: Option<GraphQuery>) -> GraphResult<GraphSnapshot> {
        let mut diagnostics = SnapshotDiagnostics::default();
        let (nodes, edges) = self.build(payload, &mut diagnostics)?;
        Ok(GraphSnapshot::from_validated(nodes, edges, diagnostics, query))
    }

    /// Validates already-typed records, e.g. from tests or a cache. Numbers
    /// are clamped the same way payload fields are.
    pub fn from_records(&self, nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> GraphSnapshot {
        let mut diagnostics = SnapshotDiagnostics::default();
        let nodes = dedupe_nodes(nodes.into_iter().map(clamp_node).collect(), &mut diagnostics);
        let edges = edges.into_iter().map(clamp_edge).collect();
        let known: HashSet<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        let edges = self.finish_edges(edges, &known, &mut diagnostics);
        GraphSnapshot::from_validated(nodes, edges, diagnostics, None)
    }

    fn build(
        &self,
        payload: RawGraphPayload,
        diagnostics: &mut SnapshotDiagnostics,
    ) -> GraphResult<(Vec<GraphNode>, Vec<GraphEdge>)> {
        let Some(raw_nodes) = payload.nodes else {
            return Err(GraphError::DataValidation(
                "`nodes` field is missing".to_string(),
            ));
        };

        let mut nodes = Vec::with_capacity(raw_nodes.len());
        for raw in raw_nodes {
            match normalize_node(raw) {
                Some(node) => nodes.push(node),
                None => {
                    tracing::warn!("Dropping node without an id");
                    diagnostics.malformed_nodes += 1;
                }
            }
        }
        let nodes = dedupe_nodes(nodes, diagnostics);
        let known: HashSet<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();

        let raw_edges = payload.edges.unwrap_or_default();
        let edges: Vec<GraphEdge> = raw_edges
            .into_iter()
            .enumerate()
            .map(|(i, raw)| normalize_edge(raw, i))
            .collect();
        let edges = self.finish_edges(edges, &known, diagnostics);

        tracing::debug!(
            "Adapted graph payload: {} nodes, {} edges ({} dangling dropped)",
            nodes.len(),
            edges.len(),
            diagnostics.dangling_edges.len()
        );
        Ok((nodes, edges))
    }

    fn finish_edges(
        &self,
        edges: Vec<GraphEdge>,
        known: &HashSet<NodeId>,
        diagnostics: &mut SnapshotDiagnostics,
    ) -> Vec<GraphEdge> {
        let mut seen_ids = HashSet::new();
        let mut kept = Vec::with_capacity(edges.len());

        for edge in edges {
            let missing = [&edge.source_id, &edge.target_id]
                .into_iter()
                .find(|id| !known.contains(*id))
                .cloned();
            if let Some(missing) = missing {
                tracing::warn!(
                    "Dropping edge {} because node {} is missing from the graph payload",
                    edge.id,
                    if missing.as_str().is_empty() { "<none>" } else { missing.as_str() }
                );
                diagnostics.dangling_edges.push(DanglingEdgeWarning {
                    edge: edge.id,
                    missing,
                });
                continue;
            }
            if !seen_ids.insert(edge.id.clone()) {
                tracing::warn!("Dropping edge with duplicate id {}", edge.id);
                diagnostics.duplicate_edges.push(edge.id);
                continue;
            }
            kept.push(edge);
        }

        match self.parallel_edges {
            ParallelEdgePolicy::Separate => kept,
            ParallelEdgePolicy::Merge => merge_parallel(kept, diagnostics),
        }
    }
}

fn decode_node(item: &Value) -> Option<RawNode> {
    match item {
        Value::String(id) => Some(RawNode::with_id(id.clone())),
        Value::Object(fields) => Some(RawNode::from_map(fields)),
        other => {
            tracing::warn!("Dropping node entry of type {}", value_kind(other));
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn non_negative(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.max(0.0),
        _ => default,
    }
}

fn confidence(value: Option<f64>) -> f64 {
    match value {
        Some(c) if c.is_finite() => c.clamp(0.0, 100.0),
        _ => DEFAULT_CONFIDENCE_SCORE,
    }
}

fn count(value: Option<f64>, default: u64) -> u64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v.floor() as u64,
        Some(v) if v.is_finite() => 0,
        _ => default,
    }
}

fn normalize_node(raw: RawNode) -> Option<GraphNode> {
    let id = raw.id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;

    let entity_type = match raw.entity_type.as_deref() {
        None => EntityType::Unknown,
        Some(s) => s.parse().unwrap_or_else(|e| {
            tracing::debug!("Node {}: {}, using unknown", id, e);
            EntityType::Unknown
        }),
    };

    let confidence_score = confidence(raw.confidence_score);

    let tags: BTreeSet<String> = raw
        .tags
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Some(GraphNode {
        id: NodeId(id),
        label: raw
            .label
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        entity_type,
        total_volume_usd: non_negative(raw.total_volume_usd, DEFAULT_TOTAL_VOLUME_USD),
        confidence_score,
        is_active: raw.is_active.unwrap_or(false),
        transaction_count: count(raw.transaction_count, DEFAULT_TRANSACTION_COUNT),
        tags,
    })
}

fn normalize_edge(raw: RawEdge, position: usize) -> GraphEdge {
    let source = raw.source_id.map(|s| s.trim().to_string()).unwrap_or_default();
    let target = raw.target_id.map(|s| s.trim().to_string()).unwrap_or_default();
    let id = raw
        .id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("{source}->{target}#{position}"));

    GraphEdge {
        id: EdgeId(id),
        source_id: NodeId(source),
        target_id: NodeId(target),
        transfer_amount_usd: non_negative(raw.transfer_amount_usd, 0.0),
        is_suspected_otc: raw.is_suspected_otc.unwrap_or(false),
        edge_count: count(raw.edge_count, 1).clamp(1, u32::MAX as u64) as u32,
        transaction_count: count(raw.transaction_count, 0),
    }
}

fn clamp_node(mut node: GraphNode) -> GraphNode {
    node.total_volume_usd = non_negative(Some(node.total_volume_usd), DEFAULT_TOTAL_VOLUME_USD);
    node.confidence_score = confidence(Some(node.confidence_score));
    node
}

fn clamp_edge(mut edge: GraphEdge) -> GraphEdge {
    edge.transfer_amount_usd = non_negative(Some(edge.transfer_amount_usd), 0.0);
    edge.edge_count = edge.edge_count.max(1);
    edge
}

fn dedupe_nodes(nodes: Vec<GraphNode>, diagnostics: &mut SnapshotDiagnostics) -> Vec<GraphNode> {
    let mut seen = HashSet::with_capacity(nodes.len());
    let mut kept = Vec::with_capacity(nodes.len());
    for node in nodes {
        if seen.insert(node.id.clone()) {
            kept.push(node);
        } else {
            tracing::warn!("Dropping duplicate node {}, keeping first occurrence", node.id);
            diagnostics.duplicate_nodes.push(node.id);
        }
    }
    kept
}

/// Collapses edges sharing the same ordered (source, target) pair into the
/// first one seen. Output keeps first-seen order.
fn merge_parallel(edges: Vec<GraphEdge>, diagnostics: &mut SnapshotDiagnostics) -> Vec<GraphEdge> {
    let mut slot_by_pair: HashMap<(NodeId, NodeId), usize> = HashMap::new();
    let mut merged: Vec<GraphEdge> = Vec::with_capacity(edges.len());

    for edge in edges {
        let key = (edge.source_id.clone(), edge.target_id.clone());
        match slot_by_pair.get(&key) {
            Some(&slot) => {
                let target = &mut merged[slot];
                target.transfer_amount_usd += edge.transfer_amount_usd;
                target.edge_count = target.edge_count.saturating_add(edge.edge_count);
                target.transaction_count += edge.transaction_count;
                target.is_suspected_otc |= edge.is_suspected_otc;
                diagnostics.merged_edges += 1;
            }
            None => {
                slot_by_pair.insert(key, merged.len());
                merged.push(edge);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_numeric_fields_get_defaults() {
        let adapter = GraphDataAdapter::default();
        let snapshot = adapter
            .adapt_value(&json!({"nodes": [{"id": "0xA"}]}), None)
            .unwrap();
        let node = snapshot.node(&NodeId::from("0xA")).unwrap();
        assert_eq!(node.total_volume_usd, 0.0);
        assert_eq!(node.confidence_score, 50.0);
        assert_eq!(node.transaction_count, 0);
        assert_eq!(node.entity_type, EntityType::Unknown);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let adapter = GraphDataAdapter::default();
        let snapshot = adapter
            .adapt_value(
                &json!({"nodes": [
                    {"id": "0xA", "confidenceScore": 140, "totalVolumeUsd": -5},
                    {"id": "0xB", "confidenceScore": -3, "transactionCount": -2}
                ]}),
                None,
            )
            .unwrap();
        let a = snapshot.node(&NodeId::from("0xA")).unwrap();
        let b = snapshot.node(&NodeId::from("0xB")).unwrap();
        assert_eq!(a.confidence_score, 100.0);
        assert_eq!(a.total_volume_usd, 0.0);
        assert_eq!(b.confidence_score, 0.0);
        assert_eq!(b.transaction_count, 0);
    }

    #[test]
    fn test_dangling_edges_are_dropped_and_recorded() {
        let adapter = GraphDataAdapter::default();
        let snapshot = adapter
            .adapt_value(
                &json!({
                    "nodes": [{"id": "0xA"}, {"id": "0xB"}],
                    "edges": [
                        {"id": "ok", "source": "0xA", "target": "0xB"},
                        {"id": "bad", "source": "0xA", "target": "0xZ"},
                        {"id": "no-source", "target": "0xB"}
                    ]
                }),
                None,
            )
            .unwrap();

        assert_eq!(snapshot.edge_count(), 1);
        assert_eq!(snapshot.edges()[0].id.as_str(), "ok");
        let dangling = &snapshot.diagnostics().dangling_edges;
        assert_eq!(dangling.len(), 2);
        assert_eq!(dangling[0].missing.as_str(), "0xZ");
        assert_eq!(dangling[1].missing.as_str(), "");
    }

    #[test]
    fn test_duplicate_nodes_keep_first() {
        let adapter = GraphDataAdapter::default();
        let snapshot = adapter
            .adapt_value(
                &json!({"nodes": [
                    {"id": "0xA", "label": "first"},
                    {"id": "0xA", "label": "second"}
                ]}),
                None,
            )
            .unwrap();
        assert_eq!(snapshot.node_count(), 1);
        assert_eq!(
            snapshot.node(&NodeId::from("0xA")).unwrap().label.as_deref(),
            Some("first")
        );
        assert_eq!(snapshot.diagnostics().duplicate_nodes.len(), 1);
    }

    #[test]
    fn test_nodes_without_id_or_wrong_shape_are_dropped() {
        let adapter = GraphDataAdapter::default();
        let snapshot = adapter
            .adapt_value(
                &json!({"nodes": [{"label": "anon"}, 42, "0xB", {"id": "  "}]}),
                None,
            )
            .unwrap();
        assert_eq!(snapshot.node_count(), 1);
        assert!(snapshot.contains_node(&NodeId::from("0xB")));
        assert_eq!(snapshot.diagnostics().malformed_nodes, 3);
    }

    #[test]
    fn test_edges_not_a_list_degrade_to_empty() {
        let adapter = GraphDataAdapter::default();
        let snapshot = adapter
            .adapt_value(&json!({"nodes": [{"id": "0xA"}], "edges": "oops"}), None)
            .unwrap();
        assert_eq!(snapshot.edge_count(), 0);
    }

    #[test]
    fn test_nodes_not_a_list_is_validation_error() {
        let adapter = GraphDataAdapter::default();
        let err = adapter
            .adapt_value(&json!({"nodes": {"id": "0xA"}}), None)
            .unwrap_err();
        assert!(matches!(err, GraphError::DataValidation(_)));

        let err = adapter.adapt_value(&json!([1, 2]), None).unwrap_err();
        assert!(matches!(err, GraphError::DataValidation(_)));

        let err = adapter.adapt_json_str("{not json", None).unwrap_err();
        assert!(matches!(err, GraphError::DataValidation(_)));
    }

    #[test]
    fn test_synthesized_edge_ids_and_edge_count_floor() {
        let adapter = GraphDataAdapter::default();
        let snapshot = adapter
            .adapt_value(
                &json!({
                    "nodes": ["0xA", "0xB"],
                    "edges": [{"source": "0xA", "target": "0xB", "edgeCount": 0}]
                }),
                None,
            )
            .unwrap();
        let edge = &snapshot.edges()[0];
        assert_eq!(edge.id.as_str(), "0xA->0xB#0");
        assert_eq!(edge.edge_count, 1);
    }

    #[test]
    fn test_separate_policy_keeps_parallel_edges() {
        let adapter = GraphDataAdapter::new(ParallelEdgePolicy::Separate);
        let snapshot = adapter
            .adapt_value(
                &json!({
                    "nodes": ["0xA", "0xB"],
                    "edges": [
                        {"id": "e1", "source": "0xA", "target": "0xB", "transferAmountUsd": 10},
                        {"id": "e2", "source": "0xA", "target": "0xB", "transferAmountUsd": 20}
                    ]
                }),
                None,
            )
            .unwrap();
        assert_eq!(snapshot.edge_count(), 2);
        assert_eq!(snapshot.diagnostics().merged_edges, 0);
    }

    #[test]
    fn test_merge_policy_aggregates_parallel_edges() {
        let adapter = GraphDataAdapter::new(ParallelEdgePolicy::Merge);
        let snapshot = adapter
            .adapt_value(
                &json!({
                    "nodes": ["0xA", "0xB"],
                    "edges": [
                        {"id": "e1", "source": "0xA", "target": "0xB", "transferAmountUsd": 10, "transactionCount": 1},
                        {"id": "e2", "source": "0xA", "target": "0xB", "transferAmountUsd": 20, "isSuspectedOtc": true, "edgeCount": 3, "transactionCount": 4},
                        {"id": "e3", "source": "0xB", "target": "0xA", "transferAmountUsd": 5}
                    ]
                }),
                None,
            )
            .unwrap();

        assert_eq!(snapshot.edge_count(), 2);
        let merged = snapshot.edge(&EdgeId::from("e1")).unwrap();
        assert_eq!(merged.transfer_amount_usd, 30.0);
        assert_eq!(merged.edge_count, 4);
        assert_eq!(merged.transaction_count, 5);
        assert!(merged.is_suspected_otc);
        assert!(snapshot.edge(&EdgeId::from("e3")).is_some());
        assert_eq!(snapshot.diagnostics().merged_edges, 1);
    }

    #[test]
    fn test_from_records_validates_typed_input() {
        let adapter = GraphDataAdapter::default();
        let snapshot = adapter.from_records(
            vec![GraphNode::new("0xA"), GraphNode::new("0xA"), GraphNode::new("0xB")],
            vec![
                GraphEdge::new("e1", "0xA", "0xB"),
                GraphEdge::new("e2", "0xA", "0xQ"),
            ],
        );
        assert_eq!(snapshot.node_count(), 2);
        assert_eq!(snapshot.edge_count(), 1);
        assert!(!snapshot.diagnostics().is_clean());
    }

    #[test]
    fn test_from_records_clamps_numbers() {
        let mut fund = GraphNode::new("0xA");
        fund.total_volume_usd = -50.0;
        fund.confidence_score = f64::NAN;
        let mut desk = GraphNode::new("0xB");
        desk.confidence_score = 250.0;
        let mut edge = GraphEdge::new("e1", "0xA", "0xB");
        edge.transfer_amount_usd = f64::INFINITY;
        edge.edge_count = 0;

        let snapshot = GraphDataAdapter::default().from_records(vec![fund, desk], vec![edge]);
        let fund = snapshot.node(&NodeId::from("0xA")).unwrap();
        assert_eq!(fund.total_volume_usd, 0.0);
        assert_eq!(fund.confidence_score, DEFAULT_CONFIDENCE_SCORE);
        assert_eq!(snapshot.node(&NodeId::from("0xB")).unwrap().confidence_score, 100.0);
        let edge = &snapshot.edges()[0];
        assert_eq!(edge.transfer_amount_usd, 0.0);
        assert_eq!(edge.edge_count, 1);
    }

    #[test]
    fn test_duplicate_key_spellings_keep_node_and_edges() {
        let snapshot = GraphDataAdapter::default()
            .adapt_value(
                &json!({
                    "nodes": [{"id": "0xA", "address": "0xA", "label": "Desk"}, {"id": "0xB"}],
                    "edges": [{"source": "0xA", "target": "0xB", "sourceId": "0xA"}]
                }),
                None,
            )
            .unwrap();

        assert_eq!(snapshot.node_count(), 2);
        assert_eq!(
            snapshot.node(&NodeId::from("0xA")).unwrap().label.as_deref(),
            Some("Desk")
        );
        assert_eq!(snapshot.edge_count(), 1);
        assert!(snapshot.diagnostics().is_clean());
    }

    #[test]
    fn test_adapt_keeps_query() {
        let adapter = GraphDataAdapter::default();
        let query = GraphQuery::new("0xA", "ethereum");
        let snapshot = adapter
            .adapt(
                RawGraphPayload {
                    nodes: Some(vec![RawNode::with_id("0xA")]),
                    edges: None,
                },
                Some(query.clone()),
            )
            .unwrap();
        assert_eq!(snapshot.query(), Some(&query));

        let err = adapter.adapt(RawGraphPayload::default(), None).unwrap_err();
        assert!(matches!(err, GraphError::DataValidation(_)));
    }
}
