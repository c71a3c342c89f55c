use std::collections::HashMap;
use txgraph_core::{EdgeId, NodeId, Point};

/// Result of a hit test. Nodes win over edges.
#[derive(Debug, Clone, PartialEq)]
pub enum HitResult {
    None,
    Node(NodeId),
    Edge(EdgeId),
}

/// Edge shape in graph space: a quadratic curve from `from` to `to` whose
/// control point is pushed sideways by `curvature` times the chord length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeGeometry {
    pub from: Point,
    pub to: Point,
    pub curvature: f32,
}

impl EdgeGeometry {
    pub fn new(from: Point, to: Point, curvature: f32) -> Self {
        Self {
            from,
            to,
            curvature,
        }
    }

    pub fn is_loop(&self) -> bool {
        self.from.distance(self.to) <= f32::EPSILON
    }

    pub fn control_point(&self) -> Point {
        let mid = self.from.lerp(self.to, 0.5);
        let (dx, dy) = (self.to.x - self.from.x, self.to.y - self.from.y);
        // Perpendicular of the chord, scaled by chord length.
        Point::new(mid.x - dy * self.curvature, mid.y + dx * self.curvature)
    }

    pub fn point_at(&self, t: f32) -> Point {
        let c = self.control_point();
        let u = 1.0 - t;
        Point::new(
            u * u * self.from.x + 2.0 * u * t * c.x + t * t * self.to.x,
            u * u * self.from.y + 2.0 * u * t * c.y + t * t * self.to.y,
        )
    }

    /// Approximate distance from `p` to the curve.
    pub fn distance_to(&self, p: Point, samples: usize) -> f32 {
        let samples = samples.max(1);
        let mut best = f32::INFINITY;
        let mut prev = self.from;
        for i in 1..=samples {
            let next = self.point_at(i as f32 / samples as f32);
            best = best.min(distance_to_segment(p, prev, next));
            prev = next;
        }
        best
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len_sq = abx * abx + aby * aby;
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + abx * t, a.y + aby * t))
}

/// Spatial lookup over the current scene, refreshed after every layout or
/// style change.
#[derive(Debug, Clone)]
pub struct HitTester {
    /// Center and radius per node.
    nodes: HashMap<NodeId, (Point, f32)>,
    /// Loop edges are stored with their node radius so the loop can be placed.
    edges: Vec<(EdgeId, EdgeGeometry, f32)>,
    edge_tolerance: f32,
    bezier_samples: usize,
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTester {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            edge_tolerance: 6.0,
            bezier_samples: 24,
        }
    }

    pub fn with_tolerance(tolerance: f32) -> Self {
        Self {
            edge_tolerance: tolerance,
            ..Self::new()
        }
    }

    pub fn edge_tolerance(&self) -> f32 {
        self.edge_tolerance
    }

    pub fn set_edge_tolerance(&mut self, tolerance: f32) {
        self.edge_tolerance = tolerance.max(0.0);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    pub fn insert_node(&mut self, id: NodeId, center: Point, radius: f32) {
        self.nodes.insert(id, (center, radius));
    }

    /// `node_radius` sizes the loop drawn for self-referencing edges.
    pub fn insert_edge(&mut self, id: EdgeId, geometry: EdgeGeometry, node_radius: f32) {
        self.edges.push((id, geometry, node_radius));
    }

    pub fn hit_test(&self, pos: Point) -> HitResult {
        if let Some(node) = self.hit_test_node(pos) {
            return HitResult::Node(node);
        }
        if let Some(edge) = self.hit_test_edge(pos) {
            return HitResult::Edge(edge);
        }
        HitResult::None
    }

    /// Among overlapping nodes the smallest wins, then the closest center.
    pub fn hit_test_node(&self, pos: Point) -> Option<NodeId> {
        self.nodes
            .iter()
            .filter_map(|(id, &(center, radius))| {
                let distance = pos.distance(center);
                (distance <= radius).then_some((id, radius, distance))
            })
            .min_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
                    .then_with(|| a.0.cmp(b.0))
            })
            .map(|(id, _, _)| id.clone())
    }

    pub fn hit_test_edge(&self, pos: Point) -> Option<EdgeId> {
        self.edges
            .iter()
            .filter_map(|(id, geometry, node_radius)| {
                let distance = if geometry.is_loop() {
                    let loop_radius = node_radius * 0.6;
                    let center = Point::new(geometry.from.x, geometry.from.y - node_radius - loop_radius * 0.5);
                    (pos.distance(center) - loop_radius).abs()
                } else {
                    geometry.distance_to(pos, self.bezier_samples)
                };
                (distance <= self.edge_tolerance).then_some((id, distance))
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, _)| id.clone())
    }
}
