//! Interaction state machine: hover, selection, drag and context menu.
//!
//! The controller never touches node or edge records. It owns only transient
//! state (highlight sets, drag overrides, the tooltip, the open menu) and all
//! of it is dropped when the snapshot is replaced.

use crate::layout::Positions;
use crate::snapshot::GraphSnapshot;
use crate::style::{EdgeState, NodeState};
use crate::tooltip::{TooltipInfo, TooltipManager};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use txgraph_core::{EdgeId, GraphError, GraphNode, GraphResult, NodeId, Point};
use txgraph_events::{ContextMenuAction, EdgeInfo, Event, EventBus, HoverTarget};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractionConfig {
    /// Screen distance a pressed pointer must travel before a press becomes
    /// a drag.
    pub drag_threshold: f32,
    /// Screen distance within which an edge counts as hit.
    pub hit_tolerance: f32,
    pub show_tooltips: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 4.0,
            hit_tolerance: 6.0,
            show_tooltips: true,
        }
    }
}

/// Pointer location in both coordinate systems.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerPosition {
    pub graph: Point,
    pub screen: Point,
}

impl PointerPosition {
    pub fn new(graph: Point, screen: Point) -> Self {
        Self { graph, screen }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub node: GraphNode,
    pub screen_x: f32,
    pub screen_y: f32,
}

impl ContextMenu {
    pub fn actions(&self) -> &'static [ContextMenuAction] {
        &ContextMenuAction::ALL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    HoveringNode(NodeId),
    HoveringEdge(EdgeId),
    DraggingNode {
        node: NodeId,
        /// Pointer minus node position at drag start.
        grab_offset: Point,
    },
    ContextMenuOpen(ContextMenu),
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::HoveringNode(_) => "hoveringNode",
            InteractionState::HoveringEdge(_) => "hoveringEdge",
            InteractionState::DraggingNode { .. } => "draggingNode",
            InteractionState::ContextMenuOpen(_) => "contextMenuOpen",
        }
    }
}

/// Elements to emphasize. When `dimmed` is set, everything outside the
/// active sets renders de-emphasized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightState {
    pub active_node_ids: HashSet<NodeId>,
    pub active_edge_ids: HashSet<EdgeId>,
    pub dimmed: bool,
}

impl HighlightState {
    /// `{node} ∪ neighbors(node)` and the node's incident edges. Cost is
    /// bounded by the node's degree.
    pub fn for_node(snapshot: &GraphSnapshot, node: &NodeId) -> Self {
        let mut active_node_ids = HashSet::with_capacity(snapshot.degree(node) + 1);
        let mut active_edge_ids = HashSet::with_capacity(snapshot.degree(node));
        active_node_ids.insert(node.clone());
        for edge in snapshot.incident_edges(node) {
            active_edge_ids.insert(edge.id.clone());
            if let Some(other) = edge.other_end(node) {
                active_node_ids.insert(other.clone());
            }
        }
        Self {
            active_node_ids,
            active_edge_ids,
            dimmed: true,
        }
    }

    pub fn for_edge(snapshot: &GraphSnapshot, edge: &EdgeId) -> Self {
        let mut highlight = Self {
            dimmed: true,
            ..Default::default()
        };
        if let Some(edge) = snapshot.edge(edge) {
            highlight.active_edge_ids.insert(edge.id.clone());
            highlight.active_node_ids.insert(edge.source_id.clone());
            highlight.active_node_ids.insert(edge.target_id.clone());
        }
        highlight
    }

    pub fn is_empty(&self) -> bool {
        !self.dimmed && self.active_node_ids.is_empty() && self.active_edge_ids.is_empty()
    }

    pub fn is_node_dimmed(&self, id: &NodeId) -> bool {
        self.dimmed && !self.active_node_ids.contains(id)
    }

    pub fn is_edge_dimmed(&self, id: &EdgeId) -> bool {
        self.dimmed && !self.active_edge_ids.contains(id)
    }
}

/// Result of releasing a dragged node.
#[derive(Debug, Clone, PartialEq)]
pub struct DragRelease {
    pub node: NodeId,
    pub position: Point,
    /// The node was handed back to the layout instead of staying pinned.
    pub released_to_layout: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerUpOutcome {
    /// Nothing was pressed.
    None,
    /// Press and release without crossing the drag threshold.
    Clicked(NodeId),
    DragEnded(DragRelease),
}

#[derive(Debug, Clone)]
struct PendingPress {
    node: NodeId,
    start: PointerPosition,
    node_position: Point,
}

pub struct InteractionController {
    config: InteractionConfig,
    snapshot: GraphSnapshot,
    state: InteractionState,
    hover_highlight: HighlightState,
    selected: Option<NodeId>,
    selection_highlight: HighlightState,
    pending_press: Option<PendingPress>,
    overrides: Positions,
    tooltip: TooltipManager,
    events: EventBus,
}

impl InteractionController {
    pub fn new(config: InteractionConfig, events: EventBus) -> Self {
        Self {
            config,
            snapshot: GraphSnapshot::empty(),
            state: InteractionState::Idle,
            hover_highlight: HighlightState::default(),
            selected: None,
            selection_highlight: HighlightState::default(),
            pending_press: None,
            overrides: Positions::new(),
            tooltip: TooltipManager::new(),
            events,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: InteractionConfig) {
        if !config.show_tooltips {
            self.tooltip.hide();
        }
        self.config = config;
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    /// Swaps in a new snapshot and drops every piece of transient state.
    pub fn set_snapshot(&mut self, snapshot: GraphSnapshot) {
        if self.snapshot.same_as(&snapshot) {
            return;
        }
        self.snapshot = snapshot;
        self.reset();
    }

    /// Back to `Idle` with no highlight, selection, overrides or tooltip.
    pub fn reset(&mut self) {
        if !self.state.is_idle() {
            tracing::debug!("Interaction reset from {}", self.state.name());
        }
        self.state = InteractionState::Idle;
        self.hover_highlight = HighlightState::default();
        self.selected = None;
        self.selection_highlight = HighlightState::default();
        self.pending_press = None;
        self.overrides.clear();
        self.tooltip.hide();
    }

    // ------------------------------------------------------------------------
    // Hover
    // ------------------------------------------------------------------------

    pub fn hover_node(&mut self, id: &NodeId, pointer: PointerPosition) -> GraphResult<()> {
        if self.hover_suppressed() {
            return Ok(());
        }
        if matches!(&self.state, InteractionState::HoveringNode(current) if current == id) {
            self.tooltip.move_to(pointer.screen);
            return Ok(());
        }
        let node = self
            .snapshot
            .node(id)
            .cloned()
            .ok_or_else(|| GraphError::UnknownNode(id.clone()))?;

        self.state = InteractionState::HoveringNode(id.clone());
        self.hover_highlight = HighlightState::for_node(&self.snapshot, id);
        if self.config.show_tooltips {
            self.tooltip.show(TooltipInfo::for_node(&node), pointer.screen);
        }
        self.events.publish(Event::NodeHovered {
            target: Some(HoverTarget::Node(node)),
        });
        Ok(())
    }

    pub fn hover_edge(&mut self, id: &EdgeId, pointer: PointerPosition) -> GraphResult<()> {
        if self.hover_suppressed() {
            return Ok(());
        }
        if matches!(&self.state, InteractionState::HoveringEdge(current) if current == id) {
            self.tooltip.move_to(pointer.screen);
            return Ok(());
        }
        let info = self.edge_info(id)?;

        self.state = InteractionState::HoveringEdge(id.clone());
        self.hover_highlight = HighlightState::for_edge(&self.snapshot, id);
        if self.config.show_tooltips {
            self.tooltip.show(
                TooltipInfo::for_edge(&info.edge, &info.source, &info.target),
                pointer.screen,
            );
        }
        self.events.publish(Event::NodeHovered {
            target: Some(HoverTarget::Edge(info)),
        });
        Ok(())
    }

    /// Pointer left the hovered element. Restores the pre-hover highlight.
    pub fn hover_clear(&mut self) {
        if !matches!(
            self.state,
            InteractionState::HoveringNode(_) | InteractionState::HoveringEdge(_)
        ) {
            return;
        }
        self.state = InteractionState::Idle;
        self.hover_highlight = HighlightState::default();
        self.tooltip.hide();
        self.events.publish(Event::NodeHovered { target: None });
    }

    fn hover_suppressed(&self) -> bool {
        matches!(
            self.state,
            InteractionState::DraggingNode { .. } | InteractionState::ContextMenuOpen(_)
        )
    }

    fn edge_info(&self, id: &EdgeId) -> GraphResult<EdgeInfo> {
        let edge = self
            .snapshot
            .edge(id)
            .ok_or_else(|| GraphError::UnknownEdge(id.clone()))?;
        let source = self
            .snapshot
            .node(&edge.source_id)
            .ok_or_else(|| GraphError::UnknownNode(edge.source_id.clone()))?;
        let target = self
            .snapshot
            .node(&edge.target_id)
            .ok_or_else(|| GraphError::UnknownNode(edge.target_id.clone()))?;
        Ok(EdgeInfo {
            edge: edge.clone(),
            source: source.clone(),
            target: target.clone(),
        })
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Selects `id` and reports the click.
    pub fn click_node(&mut self, id: &NodeId) -> GraphResult<()> {
        let node = self
            .snapshot
            .node(id)
            .cloned()
            .ok_or_else(|| GraphError::UnknownNode(id.clone()))?;
        if matches!(self.state, InteractionState::ContextMenuOpen(_)) {
            self.state = InteractionState::Idle;
        }
        self.select(Some(id.clone()));
        self.events.publish(Event::NodeClicked { node });
        Ok(())
    }

    /// Sets or clears the selection without publishing a click.
    pub fn select(&mut self, id: Option<NodeId>) {
        match id {
            Some(id) if self.snapshot.contains_node(&id) => {
                self.selection_highlight = HighlightState::for_node(&self.snapshot, &id);
                self.selected = Some(id);
            }
            Some(id) => {
                tracing::debug!("Ignoring selection of unknown node {}", id);
            }
            None => {
                self.selected = None;
                self.selection_highlight = HighlightState::default();
            }
        }
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    /// Click on empty canvas: closes the menu and clears the selection.
    pub fn background_click(&mut self) {
        self.pending_press = None;
        if !matches!(self.state, InteractionState::DraggingNode { .. }) {
            self.state = InteractionState::Idle;
        }
        self.hover_highlight = HighlightState::default();
        self.tooltip.hide();
        self.select(None);
    }

    // ------------------------------------------------------------------------
    // Drag
    // ------------------------------------------------------------------------

    /// Arms a drag on `id`. Nothing moves until the pointer crosses the drag
    /// threshold.
    pub fn pointer_down(
        &mut self,
        id: &NodeId,
        pointer: PointerPosition,
        node_position: Point,
    ) -> GraphResult<()> {
        if !self.snapshot.contains_node(id) {
            return Err(GraphError::UnknownNode(id.clone()));
        }
        if matches!(self.state, InteractionState::ContextMenuOpen(_)) {
            self.state = InteractionState::Idle;
        }
        self.pending_press = Some(PendingPress {
            node: id.clone(),
            start: pointer,
            node_position,
        });
        Ok(())
    }

    /// Returns the dragged node's new position when a drag is in progress.
    pub fn pointer_move(&mut self, pointer: PointerPosition) -> Option<(NodeId, Point)> {
        if let Some(press) = &self.pending_press
            && press.start.screen.distance(pointer.screen) >= self.config.drag_threshold
        {
            let grab_offset = Point::new(
                press.start.graph.x - press.node_position.x,
                press.start.graph.y - press.node_position.y,
            );
            let node = press.node.clone();
            self.pending_press = None;
            tracing::debug!("Drag started on {}", node);
            self.state = InteractionState::DraggingNode { node, grab_offset };
            self.tooltip.hide();
        }

        let InteractionState::DraggingNode { node, grab_offset } = &self.state else {
            return None;
        };
        let position = Point::new(
            pointer.graph.x - grab_offset.x,
            pointer.graph.y - grab_offset.y,
        );
        self.overrides.insert(node.clone(), position);
        Some((node.clone(), position))
    }

    /// Ends a press. `layout_supports_release` decides whether a dragged
    /// node goes back to the layout or stays pinned where it was dropped.
    pub fn pointer_up(&mut self, layout_supports_release: bool) -> PointerUpOutcome {
        if let Some(press) = self.pending_press.take() {
            return match self.click_node(&press.node) {
                Ok(()) => PointerUpOutcome::Clicked(press.node),
                Err(err) => {
                    tracing::debug!("Click dropped: {}", err);
                    PointerUpOutcome::None
                }
            };
        }

        let InteractionState::DraggingNode { node, .. } = &self.state else {
            return PointerUpOutcome::None;
        };
        let node = node.clone();
        let Some(position) = self.overrides.get(&node).copied() else {
            self.state = InteractionState::Idle;
            return PointerUpOutcome::None;
        };

        if layout_supports_release {
            self.overrides.remove(&node);
        }
        self.state = InteractionState::HoveringNode(node.clone());
        self.hover_highlight = HighlightState::for_node(&self.snapshot, &node);
        PointerUpOutcome::DragEnded(DragRelease {
            node,
            position,
            released_to_layout: layout_supports_release,
        })
    }

    pub fn dragging(&self) -> Option<&NodeId> {
        match &self.state {
            InteractionState::DraggingNode { node, .. } => Some(node),
            _ => None,
        }
    }

    /// Positions pinned by dragging, layered over the layout's positions.
    pub fn position_overrides(&self) -> &Positions {
        &self.overrides
    }

    pub fn resolve_position(&self, id: &NodeId, layout: &Positions) -> Option<Point> {
        self.overrides
            .get(id)
            .or_else(|| layout.get(id))
            .copied()
    }

    // ------------------------------------------------------------------------
    // Context menu
    // ------------------------------------------------------------------------

    pub fn right_click_node(&mut self, id: &NodeId, screen: Point) -> GraphResult<()> {
        let node = self
            .snapshot
            .node(id)
            .cloned()
            .ok_or_else(|| GraphError::UnknownNode(id.clone()))?;
        self.pending_press = None;
        self.hover_highlight = HighlightState::default();
        self.tooltip.hide();
        self.state = InteractionState::ContextMenuOpen(ContextMenu {
            node,
            screen_x: screen.x,
            screen_y: screen.y,
        });
        Ok(())
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        match &self.state {
            InteractionState::ContextMenuOpen(menu) => Some(menu),
            _ => None,
        }
    }

    /// Publishes `action` for the menu's node and closes the menu.
    pub fn select_menu_action(&mut self, action: ContextMenuAction) -> Option<GraphNode> {
        let InteractionState::ContextMenuOpen(menu) =
            std::mem::replace(&mut self.state, InteractionState::Idle)
        else {
            return None;
        };
        self.events.publish(Event::ContextMenuAction {
            action,
            node: menu.node.clone(),
        });
        Some(menu.node)
    }

    pub fn close_context_menu(&mut self) {
        if matches!(self.state, InteractionState::ContextMenuOpen(_)) {
            self.state = InteractionState::Idle;
        }
    }

    // ------------------------------------------------------------------------
    // Render queries
    // ------------------------------------------------------------------------

    /// The highlight to render. Selection wins over hover.
    pub fn highlight(&self) -> &HighlightState {
        if self.selected.is_some() {
            &self.selection_highlight
        } else {
            &self.hover_highlight
        }
    }

    pub fn hovered_node(&self) -> Option<&NodeId> {
        match &self.state {
            InteractionState::HoveringNode(id) => Some(id),
            _ => None,
        }
    }

    pub fn hovered_edge(&self) -> Option<&EdgeId> {
        match &self.state {
            InteractionState::HoveringEdge(id) => Some(id),
            _ => None,
        }
    }

    pub fn node_state(&self, id: &NodeId) -> NodeState {
        NodeState::default()
            .with_selected(self.selected.as_ref() == Some(id))
            .with_hovered(self.hovered_node() == Some(id) || self.dragging() == Some(id))
            .with_dimmed(self.highlight().is_node_dimmed(id))
    }

    pub fn edge_state(&self, id: &EdgeId) -> EdgeState {
        let highlight = self.highlight();
        EdgeState::default()
            .with_active(highlight.dimmed && highlight.active_edge_ids.contains(id))
            .with_dimmed(highlight.is_edge_dimmed(id))
    }

    pub fn tooltip(&self) -> &TooltipManager {
        &self.tooltip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GraphDataAdapter;
    use txgraph_core::GraphEdge;

    /// A - B - C, B - D, and an isolated E.
    fn sample() -> GraphSnapshot {
        GraphDataAdapter::default().from_records(
            ["0xA", "0xB", "0xC", "0xD", "0xE"]
                .into_iter()
                .map(GraphNode::new)
                .collect(),
            vec![
                GraphEdge::new("ab", "0xA", "0xB"),
                GraphEdge::new("bc", "0xB", "0xC"),
                GraphEdge::new("bd", "0xB", "0xD"),
            ],
        )
    }

    fn controller() -> (InteractionController, EventBus) {
        let bus = EventBus::new();
        let mut controller = InteractionController::new(InteractionConfig::default(), bus.clone());
        controller.set_snapshot(sample());
        (controller, bus)
    }

    fn at(x: f32, y: f32) -> PointerPosition {
        PointerPosition::new(Point::new(x, y), Point::new(x, y))
    }

    fn ids(list: &[&str]) -> HashSet<NodeId> {
        list.iter().map(|s| NodeId::from(*s)).collect()
    }

    #[test]
    fn test_hover_node_highlights_neighborhood() {
        let (mut c, bus) = controller();
        c.hover_node(&NodeId::from("0xB"), at(0.0, 0.0)).unwrap();

        let h = c.highlight();
        assert!(h.dimmed);
        assert_eq!(h.active_node_ids, ids(&["0xA", "0xB", "0xC", "0xD"]));
        assert_eq!(h.active_edge_ids.len(), 3);
        assert!(c.node_state(&NodeId::from("0xE")).is_dimmed);
        assert!(c.node_state(&NodeId::from("0xB")).is_hovered);
        assert!(c.tooltip().is_visible());
        assert!(matches!(
            bus.drain().as_slice(),
            [Event::NodeHovered { target: Some(HoverTarget::Node(_)) }]
        ));
    }

    #[test]
    fn test_hover_leaf_is_depth_one_only() {
        let (mut c, _) = controller();
        c.hover_node(&NodeId::from("0xA"), at(0.0, 0.0)).unwrap();
        assert_eq!(c.highlight().active_node_ids, ids(&["0xA", "0xB"]));
        assert_eq!(c.highlight().active_edge_ids.len(), 1);
    }

    #[test]
    fn test_hover_round_trip_restores_state() {
        let (mut c, bus) = controller();
        let before = c.highlight().clone();
        c.hover_node(&NodeId::from("0xB"), at(0.0, 0.0)).unwrap();
        c.hover_clear();
        assert_eq!(c.highlight(), &before);
        assert!(c.state().is_idle());
        assert!(!c.tooltip().is_visible());
        let events = bus.drain();
        assert!(matches!(events.last(), Some(Event::NodeHovered { target: None })));
    }

    #[test]
    fn test_edge_hover_scoped_to_endpoints() {
        let (mut c, bus) = controller();
        c.hover_edge(&EdgeId::from("bc"), at(0.0, 0.0)).unwrap();
        let h = c.highlight();
        assert_eq!(h.active_node_ids, ids(&["0xB", "0xC"]));
        assert_eq!(h.active_edge_ids, [EdgeId::from("bc")].into_iter().collect());
        assert!(c.edge_state(&EdgeId::from("ab")).is_dimmed);
        assert!(c.edge_state(&EdgeId::from("bc")).is_active);
        match bus.drain().as_slice() {
            [Event::NodeHovered { target: Some(HoverTarget::Edge(info)) }] => {
                assert_eq!(info.source.id.as_str(), "0xB");
                assert_eq!(info.target.id.as_str(), "0xC");
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn test_selection_takes_precedence_over_hover() {
        let (mut c, _) = controller();
        c.click_node(&NodeId::from("0xA")).unwrap();
        c.hover_node(&NodeId::from("0xD"), at(0.0, 0.0)).unwrap();

        assert_eq!(c.highlight().active_node_ids, ids(&["0xA", "0xB"]));
        assert!(c.node_state(&NodeId::from("0xD")).is_dimmed);
        assert!(c.node_state(&NodeId::from("0xA")).is_selected);

        c.hover_clear();
        assert_eq!(c.highlight().active_node_ids, ids(&["0xA", "0xB"]));
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let (mut c, _) = controller();
        let missing = NodeId::from("0xZ");
        assert_eq!(
            c.hover_node(&missing, at(0.0, 0.0)),
            Err(GraphError::UnknownNode(missing.clone()))
        );
        assert!(c.click_node(&missing).is_err());
        assert!(c.state().is_idle());
    }

    #[test]
    fn test_press_without_movement_is_click() {
        let (mut c, bus) = controller();
        let a = NodeId::from("0xA");
        c.pointer_down(&a, at(10.0, 10.0), Point::new(10.0, 10.0)).unwrap();
        assert_eq!(c.pointer_move(at(11.0, 10.0)), None);
        assert_eq!(c.pointer_up(true), PointerUpOutcome::Clicked(a.clone()));
        assert_eq!(c.selected(), Some(&a));
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, Event::NodeClicked { node } if node.id == a)));
    }

    #[test]
    fn test_drag_pins_only_the_dragged_node() {
        let (mut c, _) = controller();
        let mut layout = Positions::new();
        for (i, node) in c.snapshot().nodes().iter().enumerate() {
            layout.insert(node.id.clone(), Point::new(i as f32 * 100.0, 0.0));
        }
        let b = NodeId::from("0xB");
        let start = layout[&b];

        c.pointer_down(&b, at(start.x + 5.0, start.y), start).unwrap();
        let moved = c.pointer_move(at(start.x + 55.0, start.y + 30.0));
        assert_eq!(moved, Some((b.clone(), Point::new(start.x + 50.0, 30.0))));
        assert!(c.dragging().is_some());
        assert!(!c.tooltip().is_visible());

        let outcome = c.pointer_up(false);
        assert!(matches!(
            outcome,
            PointerUpOutcome::DragEnded(DragRelease { released_to_layout: false, .. })
        ));
        for node in c.snapshot().nodes() {
            let resolved = c.resolve_position(&node.id, &layout);
            if node.id == b {
                assert_eq!(resolved, Some(Point::new(start.x + 50.0, 30.0)));
            } else {
                assert_eq!(resolved, layout.get(&node.id).copied());
            }
        }
    }

    #[test]
    fn test_release_to_layout_drops_override() {
        let (mut c, _) = controller();
        let a = NodeId::from("0xA");
        c.pointer_down(&a, at(0.0, 0.0), Point::ZERO).unwrap();
        c.pointer_move(at(40.0, 0.0));
        match c.pointer_up(true) {
            PointerUpOutcome::DragEnded(release) => {
                assert!(release.released_to_layout);
                assert_eq!(release.position, Point::new(40.0, 0.0));
            }
            other => panic!("expected drag end, got {other:?}"),
        }
        assert!(c.position_overrides().is_empty());
    }

    #[test]
    fn test_hover_ignored_while_dragging() {
        let (mut c, _) = controller();
        let a = NodeId::from("0xA");
        c.pointer_down(&a, at(0.0, 0.0), Point::ZERO).unwrap();
        c.pointer_move(at(20.0, 0.0));
        c.hover_node(&NodeId::from("0xE"), at(20.0, 0.0)).unwrap();
        assert_eq!(c.dragging(), Some(&a));
    }

    #[test]
    fn test_context_menu_lifecycle() {
        let (mut c, bus) = controller();
        let b = NodeId::from("0xB");
        c.hover_node(&b, at(0.0, 0.0)).unwrap();
        c.right_click_node(&b, Point::new(120.0, 80.0)).unwrap();

        let menu = c.context_menu().unwrap();
        assert_eq!(menu.node.id, b);
        assert_eq!((menu.screen_x, menu.screen_y), (120.0, 80.0));
        assert_eq!(menu.actions().len(), 4);
        assert!(!c.tooltip().is_visible());
        bus.drain();

        let node = c.select_menu_action(ContextMenuAction::ShowFlow).unwrap();
        assert_eq!(node.id, b);
        assert!(c.state().is_idle());
        assert!(matches!(
            bus.drain().as_slice(),
            [Event::ContextMenuAction { action: ContextMenuAction::ShowFlow, .. }]
        ));
        assert_eq!(c.select_menu_action(ContextMenuAction::Track), None);
    }

    #[test]
    fn test_background_click_closes_menu_and_selection() {
        let (mut c, _) = controller();
        c.click_node(&NodeId::from("0xA")).unwrap();
        c.right_click_node(&NodeId::from("0xB"), Point::ZERO).unwrap();
        c.background_click();
        assert!(c.state().is_idle());
        assert_eq!(c.selected(), None);
        assert!(c.highlight().is_empty());
    }

    #[test]
    fn test_snapshot_change_resets_everything() {
        let (mut c, _) = controller();
        let a = NodeId::from("0xA");
        c.click_node(&a).unwrap();
        c.pointer_down(&a, at(0.0, 0.0), Point::ZERO).unwrap();
        c.pointer_move(at(50.0, 0.0));
        assert!(c.dragging().is_some());

        c.set_snapshot(sample());
        assert!(c.state().is_idle());
        assert_eq!(c.selected(), None);
        assert!(c.position_overrides().is_empty());
        assert!(c.highlight().is_empty());
        assert_eq!(c.pointer_up(true), PointerUpOutcome::None);
    }

    #[test]
    fn test_same_snapshot_keeps_state() {
        let (mut c, _) = controller();
        c.click_node(&NodeId::from("0xA")).unwrap();
        let same = c.snapshot().clone();
        c.set_snapshot(same);
        assert_eq!(c.selected(), Some(&NodeId::from("0xA")));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn graph(n: usize, edges: &[(usize, usize)]) -> GraphSnapshot {
            let nodes = (0..n).map(|i| GraphNode::new(format!("0x{i}"))).collect();
            let edges = edges
                .iter()
                .enumerate()
                .map(|(k, (a, b))| {
                    GraphEdge::new(format!("e{k}"), format!("0x{}", a % n), format!("0x{}", b % n))
                })
                .collect();
            GraphDataAdapter::default().from_records(nodes, edges)
        }

        proptest! {
            #[test]
            fn prop_hover_matches_neighborhood_and_round_trips(
                n in 1usize..20,
                edges in prop::collection::vec((0usize..20, 0usize..20), 0..40),
                pick in 0usize..20,
            ) {
                let snapshot = graph(n, &edges);
                let mut c = InteractionController::new(InteractionConfig::default(), EventBus::new());
                c.set_snapshot(snapshot.clone());
                let target = NodeId::new(format!("0x{}", pick % n));
                let before = c.highlight().clone();

                c.hover_node(&target, at(0.0, 0.0)).unwrap();
                let mut expected_nodes: HashSet<NodeId> = snapshot.neighbors(&target).cloned().collect();
                expected_nodes.insert(target.clone());
                let expected_edges: HashSet<EdgeId> =
                    snapshot.incident_edges(&target).map(|e| e.id.clone()).collect();
                prop_assert_eq!(&c.highlight().active_node_ids, &expected_nodes);
                prop_assert_eq!(&c.highlight().active_edge_ids, &expected_edges);
                for node in snapshot.nodes() {
                    prop_assert_eq!(
                        c.node_state(&node.id).is_dimmed,
                        !expected_nodes.contains(&node.id)
                    );
                }

                c.hover_clear();
                prop_assert_eq!(c.highlight(), &before);
            }

            #[test]
            fn prop_drag_moves_only_target(
                n in 2usize..12,
                pick in 0usize..12,
                path in prop::collection::vec((-200.0f32..200.0, -200.0f32..200.0), 1..10),
            ) {
                let snapshot = graph(n, &[]);
                let mut c = InteractionController::new(InteractionConfig::default(), EventBus::new());
                c.set_snapshot(snapshot.clone());
                let layout: Positions = snapshot
                    .nodes()
                    .iter()
                    .enumerate()
                    .map(|(i, node)| (node.id.clone(), Point::new(i as f32 * 50.0, 0.0)))
                    .collect();
                let target = NodeId::new(format!("0x{}", pick % n));
                let origin = layout[&target];

                c.pointer_down(&target, at(origin.x, origin.y), origin).unwrap();
                c.pointer_move(at(origin.x + 100.0, origin.y + 100.0));
                for (x, y) in path {
                    c.pointer_move(at(x, y));
                }
                c.pointer_up(false);

                for node in snapshot.nodes() {
                    if node.id != target {
                        prop_assert_eq!(c.resolve_position(&node.id, &layout), Some(layout[&node.id]));
                    }
                }
            }
        }
    }
}
