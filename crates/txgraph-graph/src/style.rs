//! Visual encoding for the transfer graph.
//!
//! Pure functions from node/edge data to render properties. Nothing here
//! reads global state, so identical inputs always give identical styles and
//! the results can be cached per snapshot.

use crate::snapshot::GraphSnapshot;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use txgraph_core::{DiscoveredWalletSet, EdgeId, EntityType, GraphEdge, GraphNode, NodeId};

/// RGBA color, serialized as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Moves every channel toward black by `amount` in `[0, 1]`. Alpha is kept.
    pub fn shaded(self, amount: f32) -> Self {
        let keep = 1.0 - amount.clamp(0.0, 1.0);
        let channel = |c: u8| (f32::from(c) * keep).round() as u8;
        Self {
            r: channel(self.r),
            g: channel(self.g),
            b: channel(self.b),
            ..self
        }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

// ============================================================================
// Palette
// ============================================================================

pub const COLOR_DISCOVERED: Color = Color::rgb(245, 158, 11);
pub const COLOR_VERIFIED: Color = Color::rgb(34, 197, 94);
pub const COLOR_DEFAULT_GRAY: Color = Color::rgb(149, 165, 166);

pub const COLOR_OTC_DESK: Color = Color::rgb(239, 68, 68);
pub const COLOR_INSTITUTIONAL: Color = Color::rgb(59, 130, 246);
pub const COLOR_EXCHANGE: Color = Color::rgb(16, 185, 129);
pub const COLOR_MARKET_MAKER: Color = Color::rgb(139, 92, 246);
pub const COLOR_CEX: Color = Color::rgb(236, 72, 153);

pub const COLOR_FOCUS_BORDER: Color = Color::rgb(255, 200, 100);
pub const COLOR_NODE_BORDER: Color = Color::rgb(30, 41, 59);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Palette {
    pub discovered: Color,
    pub verified: Color,
    pub default: Color,
    pub otc_desk: Color,
    pub institutional: Color,
    pub exchange: Color,
    pub market_maker: Color,
    pub cex: Color,
    pub border: Color,
    pub focus_border: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            discovered: COLOR_DISCOVERED,
            verified: COLOR_VERIFIED,
            default: COLOR_DEFAULT_GRAY,
            otc_desk: COLOR_OTC_DESK,
            institutional: COLOR_INSTITUTIONAL,
            exchange: COLOR_EXCHANGE,
            market_maker: COLOR_MARKET_MAKER,
            cex: COLOR_CEX,
            border: COLOR_NODE_BORDER,
            focus_border: COLOR_FOCUS_BORDER,
        }
    }
}

impl Palette {
    /// Entity palette entry. `Unknown` has no entry and falls through to the
    /// default gray.
    pub fn entity_color(&self, entity_type: EntityType) -> Option<Color> {
        match entity_type {
            EntityType::OtcDesk => Some(self.otc_desk),
            EntityType::Institutional => Some(self.institutional),
            EntityType::Exchange => Some(self.exchange),
            EntityType::MarketMaker => Some(self.market_maker),
            EntityType::Cex => Some(self.cex),
            EntityType::Unknown => None,
        }
    }
}

/// Every constant the resolver uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncodingConfig {
    /// `k` in `log(volume + 1) * k`
    pub size_scale: f64,
    pub min_node_size: f64,
    pub max_node_size: f64,
    pub min_opacity: f64,
    pub max_opacity: f64,
    /// `c` in `log(amount + 1) / c`
    pub edge_width_divisor: f64,
    pub min_edge_width: f64,
    pub max_edge_width: f64,
    pub verified_border_width: f32,
    pub high_confidence_border_width: f32,
    pub default_border_width: f32,
    /// Curvature step between parallel edges of the same node pair.
    pub parallel_edge_curvature: f32,
    /// Opacity multiplier for elements outside the active highlight.
    pub dimmed_opacity_factor: f32,
    pub palette: Palette,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            size_scale: 5.0,
            min_node_size: 35.0,
            max_node_size: 90.0,
            min_opacity: 0.75,
            max_opacity: 1.0,
            edge_width_divisor: 4.0,
            min_edge_width: 1.0,
            max_edge_width: 8.0,
            verified_border_width: 5.0,
            high_confidence_border_width: 4.0,
            default_border_width: 3.0,
            parallel_edge_curvature: 0.25,
            dimmed_opacity_factor: 0.2,
            palette: Palette::default(),
        }
    }
}

// ============================================================================
// Resolved styles
// ============================================================================

pub const DISCOVERED_BADGE: &str = "DISCOVERED";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStyle {
    /// Diameter in graph units.
    pub size: f32,
    pub opacity: f32,
    pub fill: Color,
    pub border_color: Color,
    pub border_width: f32,
    pub label: String,
    pub badge: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeStyle {
    pub width: f32,
    pub color: Color,
    pub opacity: f32,
    pub dashed: bool,
    pub arrow_head: bool,
    /// Signed bend relative to the straight source→target segment, 0 when
    /// the edge has no parallel siblings.
    pub curvature: f32,
}

/// Highlight flags folded into a node style at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeState {
    pub is_selected: bool,
    pub is_hovered: bool,
    pub is_dimmed: bool,
}

impl NodeState {
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.is_selected = selected;
        self
    }

    pub fn with_hovered(mut self, hovered: bool) -> Self {
        self.is_hovered = hovered;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.is_dimmed = dimmed;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeState {
    pub is_active: bool,
    pub is_dimmed: bool,
}

impl EdgeState {
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.is_dimmed = dimmed;
        self
    }
}

// ============================================================================
// Encoding functions
// ============================================================================

/// `clamp(ln(volume + 1) * k, min, max)`. Monotonic non-decreasing.
pub fn node_size(total_volume_usd: f64, config: &EncodingConfig) -> f32 {
    let volume = if total_volume_usd.is_finite() {
        total_volume_usd.max(0.0)
    } else {
        0.0
    };
    ((volume + 1.0).ln() * config.size_scale).clamp(config.min_node_size, config.max_node_size) as f32
}

/// `clamp(confidence / 100, min, max)`
pub fn node_opacity(confidence_score: f64, config: &EncodingConfig) -> f32 {
    if !confidence_score.is_finite() {
        return config.min_opacity as f32;
    }
    (confidence_score / 100.0).clamp(config.min_opacity, config.max_opacity) as f32
}

/// Priority: discovery overlay, verified tag, entity palette, default gray.
pub fn node_color(
    node: &GraphNode,
    discovered: &DiscoveredWalletSet,
    config: &EncodingConfig,
) -> Color {
    let palette = &config.palette;
    if discovered.contains(&node.id) {
        palette.discovered
    } else if node.is_verified() {
        palette.verified
    } else {
        palette
            .entity_color(node.entity_type)
            .unwrap_or(palette.default)
    }
}

pub fn border_width(node: &GraphNode, config: &EncodingConfig) -> f32 {
    if node.is_verified() {
        config.verified_border_width
    } else if node.is_high_confidence_otc() {
        config.high_confidence_border_width
    } else {
        config.default_border_width
    }
}

/// `clamp(ln(amount + 1) / c, min, max)`
pub fn edge_width(transfer_amount_usd: f64, config: &EncodingConfig) -> f32 {
    let amount = if transfer_amount_usd.is_finite() {
        transfer_amount_usd.max(0.0)
    } else {
        0.0
    };
    let divisor = if config.edge_width_divisor > 0.0 {
        config.edge_width_divisor
    } else {
        1.0
    };
    ((amount + 1.0).ln() / divisor).clamp(config.min_edge_width, config.max_edge_width) as f32
}

/// Edges take the resolved color of their source node.
pub fn edge_color(
    edge: &GraphEdge,
    snapshot: &GraphSnapshot,
    discovered: &DiscoveredWalletSet,
    config: &EncodingConfig,
) -> Color {
    snapshot
        .node(&edge.source_id)
        .map(|source| node_color(source, discovered, config))
        .unwrap_or(config.palette.default)
}

pub fn resolve_node_style(
    node: &GraphNode,
    discovered: &DiscoveredWalletSet,
    config: &EncodingConfig,
) -> NodeStyle {
    let is_discovered = discovered.contains(&node.id);
    NodeStyle {
        size: node_size(node.total_volume_usd, config),
        opacity: node_opacity(node.confidence_score, config),
        fill: node_color(node, discovered, config),
        border_color: config.palette.border,
        border_width: border_width(node, config),
        label: node.display_name(),
        badge: is_discovered.then_some(DISCOVERED_BADGE),
    }
}

pub fn resolve_edge_style(
    edge: &GraphEdge,
    snapshot: &GraphSnapshot,
    discovered: &DiscoveredWalletSet,
    curvature: f32,
    config: &EncodingConfig,
) -> EdgeStyle {
    EdgeStyle {
        width: edge_width(edge.transfer_amount_usd, config),
        color: edge_color(edge, snapshot, discovered, config),
        opacity: 1.0,
        dashed: edge.is_suspected_otc,
        arrow_head: true,
        curvature,
    }
}

/// Spreads edges sharing an unordered node pair symmetrically around the
/// straight line. The sign is normalized so A→B and B→A bend to opposite
/// sides of the same axis.
pub fn edge_curvatures(snapshot: &GraphSnapshot, config: &EncodingConfig) -> HashMap<EdgeId, f32> {
    let mut groups: HashMap<(&NodeId, &NodeId), Vec<&GraphEdge>> = HashMap::new();
    for edge in snapshot.edges() {
        let key = if edge.source_id <= edge.target_id {
            (&edge.source_id, &edge.target_id)
        } else {
            (&edge.target_id, &edge.source_id)
        };
        groups.entry(key).or_default().push(edge);
    }

    let mut curvatures = HashMap::with_capacity(snapshot.edge_count());
    for ((low, _), edges) in groups {
        let n = edges.len();
        for (i, edge) in edges.into_iter().enumerate() {
            let offset = if n <= 1 {
                0.0
            } else {
                (i as f32 - (n - 1) as f32 / 2.0) * config.parallel_edge_curvature
            };
            let sign = if &edge.source_id == low { 1.0 } else { -1.0 };
            curvatures.insert(edge.id.clone(), offset * sign);
        }
    }
    curvatures
}

/// How much darker a hovered node's border is than a selected one's.
pub const HOVER_BORDER_SHADE: f32 = 0.2;

/// Folds highlight flags into a resolved node style.
pub fn apply_node_state(style: &NodeStyle, state: NodeState, config: &EncodingConfig) -> NodeStyle {
    let mut styled = style.clone();
    if state.is_selected {
        styled.border_color = config.palette.focus_border;
        styled.border_width += 1.0;
    } else if state.is_hovered {
        styled.border_color = config.palette.focus_border.shaded(HOVER_BORDER_SHADE);
    }
    if state.is_dimmed {
        styled.opacity *= config.dimmed_opacity_factor;
    }
    styled
}

pub fn apply_edge_state(style: &EdgeStyle, state: EdgeState, config: &EncodingConfig) -> EdgeStyle {
    let mut styled = style.clone();
    if state.is_active {
        styled.width = (styled.width * 1.5).min(config.max_edge_width as f32 * 1.5);
    }
    if state.is_dimmed {
        styled.opacity *= config.dimmed_opacity_factor;
    }
    styled
}

/// Styles for a whole snapshot, computed once and looked up by id.
#[derive(Debug, Clone, Default)]
pub struct ResolvedStyles {
    nodes: HashMap<NodeId, NodeStyle>,
    edges: HashMap<EdgeId, EdgeStyle>,
}

impl ResolvedStyles {
    pub fn resolve(
        snapshot: &GraphSnapshot,
        discovered: &DiscoveredWalletSet,
        config: &EncodingConfig,
    ) -> Self {
        let nodes: HashMap<NodeId, NodeStyle> = snapshot
            .nodes()
            .par_iter()
            .map(|node| (node.id.clone(), resolve_node_style(node, discovered, config)))
            .collect();

        let curvatures = edge_curvatures(snapshot, config);
        let edges: HashMap<EdgeId, EdgeStyle> = snapshot
            .edges()
            .par_iter()
            .map(|edge| {
                let curvature = curvatures.get(&edge.id).copied().unwrap_or(0.0);
                (
                    edge.id.clone(),
                    resolve_edge_style(edge, snapshot, discovered, curvature, config),
                )
            })
            .collect();

        Self { nodes, edges }
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeStyle> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&EdgeStyle> {
        self.edges.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
