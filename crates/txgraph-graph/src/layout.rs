//! Position assignment behind one swappable interface.
//!
//! The rest of the crate talks to [`LayoutEngine`] only. Which algorithm runs
//! is a configuration choice ([`LayoutStrategyKind`]); custom strategies plug
//! in through [`LayoutStrategy`].

use crate::cancellation::CancellationToken;
use crate::snapshot::GraphSnapshot;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use txgraph_core::{GraphError, GraphResult, NodeId, Point, RankDirection, RequestId};

pub type Positions = HashMap<NodeId, Point>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutStrategyKind {
    #[default]
    ForceDirected,
    Hierarchical,
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceParams {
    pub iterations: usize,
    pub repulsion: f32,
    pub spring_strength: f32,
    pub gravity: f32,
    /// Largest displacement per node in the first iteration. Shrinks
    /// linearly to zero over the run.
    pub max_step: f32,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            iterations: 200,
            repulsion: 6000.0,
            spring_strength: 0.05,
            gravity: 0.01,
            max_step: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub node_separation: f32,
    pub edge_separation: f32,
    pub rank_direction: RankDirection,
    /// Duration of the transition from the previous layout to a new one.
    pub animation_duration_ms: u64,
    pub strategy: LayoutStrategyKind,
    /// Budget for one layout job. On expiry the view keeps its previous
    /// layout or falls back to a grid.
    pub timeout_ms: u64,
    pub force: ForceParams,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_separation: 80.0,
            edge_separation: 20.0,
            rank_direction: RankDirection::default(),
            animation_duration_ms: 500,
            strategy: LayoutStrategyKind::default(),
            timeout_ms: 2000,
            force: ForceParams::default(),
        }
    }
}

/// Input to one strategy run.
#[derive(Debug, Clone, Default)]
pub struct LayoutRequest {
    pub snapshot: GraphSnapshot,
    /// Nodes whose positions must come back unchanged.
    pub pinned: Positions,
    /// Starting positions, usually the previous layout.
    pub seed: Positions,
}

impl LayoutRequest {
    pub fn new(snapshot: GraphSnapshot) -> Self {
        Self {
            snapshot,
            ..Default::default()
        }
    }

    pub fn with_pinned(mut self, pinned: Positions) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn with_seed(mut self, seed: Positions) -> Self {
        self.seed = seed;
        self
    }
}

pub trait LayoutStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns a position for every node in the request's snapshot.
    fn compute(
        &self,
        request: &LayoutRequest,
        config: &LayoutConfig,
        cancel: &CancellationToken,
    ) -> GraphResult<Positions>;

    /// Whether a dragged node can be handed back to the algorithm on release.
    fn supports_release(&self) -> bool {
        false
    }
}

// ============================================================================
// Force-directed
// ============================================================================

/// Repulsion between all node pairs plus springs along edges.
///
/// Deterministic: no randomness, and the per-node force pass reads only the
/// previous iteration's positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceDirectedLayout;

impl ForceDirectedLayout {
    fn initial_positions(request: &LayoutRequest, config: &LayoutConfig) -> Vec<Point> {
        let nodes = request.snapshot.nodes();
        let n = nodes.len().max(1) as f32;
        let radius = (config.node_separation * n / std::f32::consts::TAU).max(config.node_separation);
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                if let Some(&p) = request.pinned.get(&node.id) {
                    return p;
                }
                if let Some(&p) = request.seed.get(&node.id) {
                    return p;
                }
                let angle = std::f32::consts::TAU * i as f32 / n;
                Point::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }
}

impl LayoutStrategy for ForceDirectedLayout {
    fn name(&self) -> &'static str {
        "force-directed"
    }

    fn supports_release(&self) -> bool {
        true
    }

    fn compute(
        &self,
        request: &LayoutRequest,
        config: &LayoutConfig,
        cancel: &CancellationToken,
    ) -> GraphResult<Positions> {
        let snapshot = &request.snapshot;
        let nodes = snapshot.nodes();
        let n = nodes.len();
        let mut positions = Self::initial_positions(request, config);
        let fixed: Vec<bool> = nodes
            .iter()
            .map(|node| request.pinned.contains_key(&node.id))
            .collect();

        let springs: Vec<(usize, usize)> = snapshot
            .edges()
            .iter()
            .filter_map(|edge| {
                let a = snapshot.node_position(&edge.source_id)?;
                let b = snapshot.node_position(&edge.target_id)?;
                (a != b).then_some((a, b))
            })
            .collect();

        let params = &config.force;
        let rest_length = config.node_separation + config.edge_separation;
        let min_distance = (config.node_separation / 4.0).max(1.0);

        for iteration in 0..params.iterations {
            cancel.check()?;

            let current = &positions;
            let mut forces: Vec<(f32, f32)> = (0..n)
                .into_par_iter()
                .map(|i| {
                    if fixed[i] {
                        return (0.0, 0.0);
                    }
                    let p = current[i];
                    let mut fx = -p.x * params.gravity;
                    let mut fy = -p.y * params.gravity;
                    for (j, q) in current.iter().enumerate() {
                        if i == j {
                            continue;
                        }
                        let (mut dx, mut dy) = (p.x - q.x, p.y - q.y);
                        if dx.abs() < f32::EPSILON && dy.abs() < f32::EPSILON {
                            // Coincident nodes: separate along a stable axis.
                            dx = (i as f32 - j as f32) * 0.01;
                            dy = 0.01;
                        }
                        let dist = (dx * dx + dy * dy).sqrt().max(min_distance);
                        let force = params.repulsion / (dist * dist);
                        fx += dx / dist * force;
                        fy += dy / dist * force;
                    }
                    (fx, fy)
                })
                .collect();

            for &(a, b) in &springs {
                let (pa, pb) = (positions[a], positions[b]);
                let (dx, dy) = (pb.x - pa.x, pb.y - pa.y);
                let dist = (dx * dx + dy * dy).sqrt().max(min_distance);
                let pull = (dist - rest_length) * params.spring_strength;
                let (fx, fy) = (dx / dist * pull, dy / dist * pull);
                if !fixed[a] {
                    forces[a].0 += fx;
                    forces[a].1 += fy;
                }
                if !fixed[b] {
                    forces[b].0 -= fx;
                    forces[b].1 -= fy;
                }
            }

            let temperature =
                params.max_step * (1.0 - iteration as f32 / params.iterations.max(1) as f32);
            for (i, (fx, fy)) in forces.into_iter().enumerate() {
                if fixed[i] {
                    continue;
                }
                let magnitude = (fx * fx + fy * fy).sqrt();
                if magnitude <= f32::EPSILON {
                    continue;
                }
                let step = magnitude.min(temperature);
                positions[i].x += fx / magnitude * step;
                positions[i].y += fy / magnitude * step;
            }
        }

        Ok(nodes
            .iter()
            .zip(positions)
            .map(|(node, p)| (node.id.clone(), p))
            .collect())
    }
}

// ============================================================================
// Hierarchical
// ============================================================================

/// Longest-path ranking followed by barycenter ordering within each rank.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalLayout;

impl HierarchicalLayout {
    const MAX_RANKING_ITERATIONS: usize = 1000;
    const BARYCENTER_PASSES: usize = 2;

    /// Node indices by snapshot position. Cycles stop growing once the
    /// iteration cap is reached and are compressed like any other rank gap.
    fn assign_ranks(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
        let mut ranks = vec![0usize; n];
        let max_iterations = (n + 2).min(Self::MAX_RANKING_ITERATIONS);
        let mut converged = false;
        for _ in 0..max_iterations {
            let mut changed = false;
            for &(source, target) in edges {
                if ranks[target] <= ranks[source] {
                    ranks[target] = ranks[source] + 1;
                    changed = true;
                }
            }
            if !changed {
                converged = true;
                break;
            }
        }
        if !converged {
            tracing::debug!(
                "Ranking did not converge after {} iterations, graph has cycles",
                max_iterations
            );
        }
        Self::compress_ranks(&mut ranks);
        ranks
    }

    fn compress_ranks(ranks: &mut [usize]) {
        let mut unique: Vec<usize> = ranks.to_vec();
        unique.sort_unstable();
        unique.dedup();
        let remap: HashMap<usize, usize> = unique
            .into_iter()
            .enumerate()
            .map(|(i, rank)| (rank, i))
            .collect();
        for rank in ranks.iter_mut() {
            if let Some(&compressed) = remap.get(rank) {
                *rank = compressed;
            }
        }
    }

    fn order_layer_by_barycenter(
        layer: &mut [usize],
        coords: &[f32],
        neighbors: &[Vec<usize>],
    ) {
        let barycenter = |node: usize| -> f32 {
            let adjacent = &neighbors[node];
            if adjacent.is_empty() {
                coords[node]
            } else {
                adjacent.iter().map(|&m| coords[m]).sum::<f32>() / adjacent.len() as f32
            }
        };
        layer.sort_by(|&a, &b| {
            barycenter(a)
                .partial_cmp(&barycenter(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    fn assign_layer_coords(layer: &[usize], coords: &mut [f32], spacing: f32) {
        let offset = (layer.len().saturating_sub(1)) as f32 * spacing / 2.0;
        for (j, &node) in layer.iter().enumerate() {
            coords[node] = j as f32 * spacing - offset;
        }
    }
}

impl LayoutStrategy for HierarchicalLayout {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn compute(
        &self,
        request: &LayoutRequest,
        config: &LayoutConfig,
        cancel: &CancellationToken,
    ) -> GraphResult<Positions> {
        let snapshot = &request.snapshot;
        let nodes = snapshot.nodes();
        let n = nodes.len();

        let edges: Vec<(usize, usize)> = snapshot
            .edges()
            .iter()
            .filter_map(|edge| {
                let a = snapshot.node_position(&edge.source_id)?;
                let b = snapshot.node_position(&edge.target_id)?;
                (a != b).then_some((a, b))
            })
            .collect();

        let mut incoming = vec![Vec::new(); n];
        let mut outgoing = vec![Vec::new(); n];
        for &(a, b) in &edges {
            outgoing[a].push(b);
            incoming[b].push(a);
        }

        let ranks = Self::assign_ranks(n, &edges);
        cancel.check()?;

        let rank_count = ranks.iter().copied().max().map_or(0, |max| max + 1);
        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
        for (node, &rank) in ranks.iter().enumerate() {
            layers[rank].push(node);
        }
        for layer in &mut layers {
            layer.sort_by(|&a, &b| nodes[a].id.cmp(&nodes[b].id));
        }

        let in_layer_spacing = config.node_separation + config.edge_separation;
        let rank_spacing = config.node_separation * 2.0;

        let mut coords = vec![0.0f32; n];
        for layer in &layers {
            Self::assign_layer_coords(layer, &mut coords, in_layer_spacing);
        }

        for _ in 0..Self::BARYCENTER_PASSES {
            for layer in layers.iter_mut().skip(1) {
                Self::order_layer_by_barycenter(layer, &coords, &incoming);
                Self::assign_layer_coords(layer, &mut coords, in_layer_spacing);
            }
            for layer in layers.iter_mut().rev().skip(1) {
                Self::order_layer_by_barycenter(layer, &coords, &outgoing);
                Self::assign_layer_coords(layer, &mut coords, in_layer_spacing);
            }
            cancel.check()?;
        }

        let direction = config.rank_direction;
        let sign = if direction.is_reversed() { -1.0 } else { 1.0 };
        Ok(nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                if let Some(&pinned) = request.pinned.get(&node.id) {
                    return (node.id.clone(), pinned);
                }
                let along = ranks[i] as f32 * rank_spacing * sign;
                let across = coords[i];
                let p = if direction.is_vertical() {
                    Point::new(across, along)
                } else {
                    Point::new(along, across)
                };
                (node.id.clone(), p)
            })
            .collect())
    }
}

// ============================================================================
// Grid
// ============================================================================

/// Row-major grid in snapshot order. Used directly or as the timeout fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridLayout;

impl LayoutStrategy for GridLayout {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn compute(
        &self,
        request: &LayoutRequest,
        config: &LayoutConfig,
        _cancel: &CancellationToken,
    ) -> GraphResult<Positions> {
        let mut positions = grid_positions(&request.snapshot, config);
        positions.extend(request.pinned.iter().map(|(id, p)| (id.clone(), *p)));
        positions.retain(|id, _| request.snapshot.contains_node(id));
        Ok(positions)
    }
}

pub fn grid_positions(snapshot: &GraphSnapshot, config: &LayoutConfig) -> Positions {
    let n = snapshot.node_count();
    let columns = (n as f32).sqrt().ceil().max(1.0) as usize;
    let spacing = config.node_separation + config.edge_separation;
    snapshot
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let (row, col) = (i / columns, i % columns);
            (
                node.id.clone(),
                Point::new(col as f32 * spacing, row as f32 * spacing),
            )
        })
        .collect()
}

pub fn strategy_for(kind: LayoutStrategyKind) -> Arc<dyn LayoutStrategy> {
    match kind {
        LayoutStrategyKind::ForceDirected => Arc::new(ForceDirectedLayout),
        LayoutStrategyKind::Hierarchical => Arc::new(HierarchicalLayout),
        LayoutStrategyKind::Grid => Arc::new(GridLayout),
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Which job a result belongs to: the query, and the run within that query.
/// A query can be laid out more than once (drag release, re-layout), so the
/// request id alone does not identify the current job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutTicket {
    pub request_id: RequestId,
    pub generation: u64,
}

impl std::fmt::Display for LayoutTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.request_id, self.generation)
    }
}

/// One layout run tagged with the query it belongs to.
#[derive(Debug, Clone)]
pub struct LayoutJob {
    pub request_id: RequestId,
    pub generation: u64,
    pub request: LayoutRequest,
    pub cancel: CancellationToken,
}

impl LayoutJob {
    /// A standalone job with a fresh token and generation zero.
    pub fn new(request_id: RequestId, request: LayoutRequest) -> Self {
        Self {
            request_id,
            generation: 0,
            request,
            cancel: CancellationToken::new(),
        }
    }

    pub fn ticket(&self) -> LayoutTicket {
        LayoutTicket {
            request_id: self.request_id,
            generation: self.generation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub request_id: RequestId,
    pub positions: Positions,
    pub strategy: &'static str,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct LayoutEngine {
    strategy: Arc<dyn LayoutStrategy>,
    config: LayoutConfig,
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("strategy", &self.strategy.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            strategy: strategy_for(config.strategy),
            config,
        }
    }

    /// Uses a caller-supplied strategy regardless of `config.strategy`.
    pub fn with_strategy(strategy: Arc<dyn LayoutStrategy>, config: LayoutConfig) -> Self {
        Self { strategy, config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn supports_release(&self) -> bool {
        self.strategy.supports_release()
    }

    /// Runs the strategy on the calling thread.
    pub fn compute_blocking(&self, job: &LayoutJob) -> GraphResult<LayoutResult> {
        let started = Instant::now();
        let mut positions = self
            .strategy
            .compute(&job.request, &self.config, &job.cancel)?;

        // Every node gets a position even if a strategy skipped one.
        let snapshot = &job.request.snapshot;
        if positions.len() < snapshot.node_count() {
            let fallback = grid_positions(snapshot, &self.config);
            for (id, p) in fallback {
                positions.entry(id).or_insert(p);
            }
        }

        let elapsed = started.elapsed();
        tracing::debug!(
            "Layout {} for job {} placed {} nodes in {:?}",
            self.strategy.name(),
            job.ticket(),
            positions.len(),
            elapsed
        );
        Ok(LayoutResult {
            request_id: job.request_id,
            positions,
            strategy: self.strategy.name(),
            elapsed,
        })
    }

    /// Runs the strategy on the blocking pool under the configured budget.
    /// On timeout the job's token is cancelled so the worker stops early.
    pub async fn run(&self, job: LayoutJob) -> GraphResult<LayoutResult> {
        let budget_ms = self.config.timeout_ms;
        let cancel = job.cancel.clone();
        let request_id = job.request_id;
        let engine = self.clone();
        let handle = tokio::task::spawn_blocking(move || engine.compute_blocking(&job));

        match tokio::time::timeout(Duration::from_millis(budget_ms), handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                tracing::error!("Layout worker for request {} failed: {}", request_id, join_error);
                Err(GraphError::LayoutFailed(join_error.to_string()))
            }
            Err(_) => {
                cancel.cancel();
                tracing::warn!(
                    "Layout for request {} exceeded {} ms budget",
                    request_id,
                    budget_ms
                );
                Err(GraphError::LayoutTimeout { budget_ms })
            }
        }
    }
}
