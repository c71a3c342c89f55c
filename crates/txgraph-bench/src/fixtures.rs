use serde_json::{Value, json};
use txgraph_core::{EntityType, GraphEdge, GraphNode, NodeId};
use txgraph_graph::{GraphDataAdapter, GraphSnapshot};

pub fn wallet_id(index: usize) -> String {
    format!("0x{:040x}", index)
}

/// `hubs` exchanges, each with `spokes` counterparties, plus a ring across
/// the hubs. Volumes spread over several orders of magnitude.
pub fn hub_and_spoke(hubs: usize, spokes: usize) -> GraphSnapshot {
    let mut nodes = Vec::with_capacity(hubs * (spokes + 1));
    let mut edges = Vec::with_capacity(hubs * (spokes + 1));

    for h in 0..hubs {
        let hub = h * (spokes + 1);
        let mut node = GraphNode::new(wallet_id(hub));
        node.entity_type = EntityType::Exchange;
        node.total_volume_usd = 50_000_000.0 * (h + 1) as f64;
        node.confidence_score = 95.0;
        node.is_active = true;
        nodes.push(node);

        for s in 1..=spokes {
            let index = hub + s;
            let mut node = GraphNode::new(wallet_id(index));
            node.entity_type = EntityType::ALL[index % EntityType::ALL.len()];
            node.total_volume_usd = 10f64.powi((index % 8) as i32);
            node.confidence_score = (index % 101) as f64;
            node.is_active = index % 3 == 0;
            nodes.push(node);

            let mut edge = GraphEdge::new(format!("e{hub}-{index}"), wallet_id(hub), wallet_id(index));
            edge.transfer_amount_usd = 10f64.powi((index % 7) as i32);
            edge.is_suspected_otc = index % 5 == 0;
            edges.push(edge);
        }

        let next = ((h + 1) % hubs) * (spokes + 1);
        if next != hub {
            let mut edge = GraphEdge::new(format!("ring{h}"), wallet_id(hub), wallet_id(next));
            edge.transfer_amount_usd = 1_000_000.0;
            edges.push(edge);
        }
    }

    GraphDataAdapter::default().from_records(nodes, edges)
}

pub fn hub(index: usize, spokes: usize) -> NodeId {
    NodeId::new(wallet_id(index * (spokes + 1)))
}

/// The same graph as raw JSON, for adapter benchmarks.
pub fn hub_and_spoke_payload(hubs: usize, spokes: usize) -> Value {
    let snapshot = hub_and_spoke(hubs, spokes);
    json!({
        "nodes": snapshot.nodes(),
        "edges": snapshot.edges(),
    })
}
