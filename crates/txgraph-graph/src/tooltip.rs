use serde::Serialize;
use txgraph_core::{GraphEdge, GraphNode, Point};

/// Content of the hover tooltip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipInfo {
    pub title: String,
    pub lines: Vec<String>,
}

impl TooltipInfo {
    pub fn for_node(node: &GraphNode) -> Self {
        let mut lines = vec![
            format!("Type: {}", node.entity_type.label()),
            format!("Volume: {}", format_usd(node.total_volume_usd)),
            format!("Confidence: {:.0}%", node.confidence_score),
            format!("Transactions: {}", node.transaction_count),
        ];
        if !node.tags.is_empty() {
            let tags: Vec<&str> = node.tags.iter().map(String::as_str).collect();
            lines.push(format!("Tags: {}", tags.join(", ")));
        }
        if node.label.is_some() {
            lines.push(format!("Address: {}", node.id.short()));
        }
        Self {
            title: node.display_name(),
            lines,
        }
    }

    pub fn for_edge(edge: &GraphEdge, source: &GraphNode, target: &GraphNode) -> Self {
        let mut lines = vec![
            format!("Amount: {}", format_usd(edge.transfer_amount_usd)),
            format!("Transfers: {}", edge.edge_count),
            format!("Transactions: {}", edge.transaction_count),
        ];
        if edge.is_suspected_otc {
            lines.push("Suspected OTC transfer".to_string());
        }
        Self {
            title: format!("{} → {}", source.display_name(), target.display_name()),
            lines,
        }
    }
}

/// Tooltip owned by the interaction controller. It exists only while
/// something is hovered.
#[derive(Debug, Clone, Default)]
pub struct TooltipManager {
    info: Option<TooltipInfo>,
    anchor: Option<Point>,
}

impl TooltipManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, info: TooltipInfo, anchor: Point) {
        self.info = Some(info);
        self.anchor = Some(anchor);
    }

    pub fn move_to(&mut self, anchor: Point) {
        if self.info.is_some() {
            self.anchor = Some(anchor);
        }
    }

    pub fn hide(&mut self) {
        self.info = None;
        self.anchor = None;
    }

    pub fn is_visible(&self) -> bool {
        self.info.is_some()
    }

    pub fn info(&self) -> Option<&TooltipInfo> {
        self.info.as_ref()
    }

    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }
}

/// `$1.25M`, `$830.0K`, `$12.50`
pub fn format_usd(amount: f64) -> String {
    let abs = amount.abs();
    let sign = if amount < 0.0 { "-" } else { "" };
    if abs >= 1e9 {
        format!("{sign}${:.2}B", abs / 1e9)
    } else if abs >= 1e6 {
        format!("{sign}${:.2}M", abs / 1e6)
    } else if abs >= 1e3 {
        format!("{sign}${:.1}K", abs / 1e3)
    } else {
        format!("{sign}${abs:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txgraph_core::EntityType;

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(12.5), "$12.50");
        assert_eq!(format_usd(830_000.0), "$830.0K");
        assert_eq!(format_usd(1_250_000.0), "$1.25M");
        assert_eq!(format_usd(3_400_000_000.0), "$3.40B");
        assert_eq!(format_usd(-2_000.0), "-$2.0K");
    }

    #[test]
    fn test_node_tooltip_lines() {
        let mut node = GraphNode::new("0x1234567890abcdef1234");
        node.label = Some("Wintermute".into());
        node.entity_type = EntityType::MarketMaker;
        node.total_volume_usd = 2_000_000.0;
        let info = TooltipInfo::for_node(&node);
        assert_eq!(info.title, "Wintermute");
        assert!(info.lines.iter().any(|l| l == "Volume: $2.00M"));
        assert!(info.lines.iter().any(|l| l.starts_with("Address: 0x1234")));
    }

    #[test]
    fn test_manager_lifecycle() {
        let mut manager = TooltipManager::new();
        manager.move_to(Point::new(1.0, 1.0));
        assert_eq!(manager.anchor(), None);

        manager.show(TooltipInfo::for_node(&GraphNode::new("0xA")), Point::ZERO);
        assert!(manager.is_visible());
        manager.move_to(Point::new(5.0, 5.0));
        assert_eq!(manager.anchor(), Some(Point::new(5.0, 5.0)));

        manager.hide();
        assert!(!manager.is_visible());
        assert_eq!(manager.anchor(), None);
    }
}
