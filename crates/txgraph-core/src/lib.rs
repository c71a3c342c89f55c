use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub mod discovery;
pub mod entity_type;
pub mod error;
pub mod query;

pub use discovery::DiscoveredWalletSet;
pub use entity_type::EntityType;
pub use error::{GraphError, GraphResult};
pub use query::{GraphQuery, RequestId};

/// Tag marking a node whose classification was manually verified.
pub const TAG_VERIFIED: &str = "verified";
/// Tag used by the OTC desk registry for verified desks.
pub const TAG_VERIFIED_OTC_DESK: &str = "verified_otc_desk";
/// Tag assigned by the backend when OTC classification confidence is high.
pub const TAG_HIGH_CONFIDENCE_OTC: &str = "HIGH_CONFIDENCE_OTC";

/// Wallet or contract address. Unique key of a node within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234…abcd` style shortening used when a node has no label.
    pub fn short(&self) -> String {
        let s = self.0.as_str();
        if s.chars().count() <= 12 {
            return s.to_string();
        }
        let head: String = s.chars().take(6).collect();
        let tail: String = s
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{head}…{tail}")
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A wallet or contract in the transfer graph.
///
/// Holds data only. Size, color and every other visual property is derived
/// from these fields at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    pub label: Option<String>,
    pub entity_type: EntityType,
    pub total_volume_usd: f64,
    /// 0-100
    pub confidence_score: f64,
    pub is_active: bool,
    pub transaction_count: u64,
    pub tags: BTreeSet<String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            label: None,
            entity_type: EntityType::Unknown,
            total_volume_usd: 0.0,
            confidence_score: 50.0,
            is_active: false,
            transaction_count: 0,
            tags: BTreeSet::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_verified(&self) -> bool {
        self.has_tag(TAG_VERIFIED) || self.has_tag(TAG_VERIFIED_OTC_DESK)
    }

    pub fn is_high_confidence_otc(&self) -> bool {
        self.has_tag(TAG_HIGH_CONFIDENCE_OTC)
    }

    /// Label if present, otherwise the shortened address.
    pub fn display_name(&self) -> String {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label.to_string(),
            _ => self.id.short(),
        }
    }
}

/// A (possibly aggregated) transfer relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub transfer_amount_usd: f64,
    pub is_suspected_otc: bool,
    /// Number of raw transfers collapsed into this edge, at least 1.
    pub edge_count: u32,
    pub transaction_count: u64,
}

impl GraphEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: EdgeId::new(id),
            source_id: NodeId::new(source),
            target_id: NodeId::new(target),
            transfer_amount_usd: 0.0,
            is_suspected_otc: false,
            edge_count: 1,
            transaction_count: 0,
        }
    }

    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source_id == node || &self.target_id == node
    }

    /// The endpoint opposite `node`, if `node` is an endpoint.
    pub fn other_end(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.source_id == node {
            Some(&self.target_id)
        } else if &self.target_id == node {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

/// Graph-space (or screen-space, depending on context) coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Flow direction for hierarchical layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankDirection {
    #[default]
    #[serde(rename = "TB")]
    TopToBottom,
    #[serde(rename = "BT")]
    BottomToTop,
    #[serde(rename = "LR")]
    LeftToRight,
    #[serde(rename = "RL")]
    RightToLeft,
}

impl RankDirection {
    pub fn is_vertical(self) -> bool {
        matches!(self, RankDirection::TopToBottom | RankDirection::BottomToTop)
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, RankDirection::BottomToTop | RankDirection::RightToLeft)
    }
}
