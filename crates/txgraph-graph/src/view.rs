//! The embeddable graph view.
//!
//! `GraphView` owns one snapshot at a time and routes everything through the
//! adapter, resolver, layout engine, interaction controller and viewport.
//! Hosts feed it payloads, layout results, pointer events and frame ticks,
//! and read back a [`RenderScene`].

use crate::adapter::GraphDataAdapter;
use crate::cancellation::CancellationToken;
use crate::hit_tester::{EdgeGeometry, HitResult, HitTester};
use crate::interaction::{
    ContextMenu, InteractionController, PointerPosition, PointerUpOutcome,
};
use crate::layout::{
    LayoutEngine, LayoutJob, LayoutRequest, LayoutResult, LayoutStrategy, LayoutTicket,
    Positions, grid_positions,
};
use crate::settings::GraphViewSettings;
use crate::snapshot::GraphSnapshot;
use crate::style::{EdgeStyle, NodeStyle, ResolvedStyles, apply_edge_state, apply_node_state};
use crate::tooltip::TooltipInfo;
use crate::viewport::{Bounds, ViewportManager, ease_in_out};
use serde_json::Value;
use std::sync::Arc;
use txgraph_core::{
    DiscoveredWalletSet, EdgeId, GraphError, GraphQuery, GraphResult, NodeId, Point, RequestId,
};
use txgraph_events::{Event, EventBus};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewStatus {
    /// No data, or the query returned no nodes.
    Empty,
    /// A query is in flight.
    Loading(RequestId),
    /// Data is in, positions are not.
    LayingOut,
    Ready,
    /// The payload was rejected. Nothing from it is rendered.
    Error(String),
}

/// What `apply_layout` did with a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutApply {
    Applied,
    /// The job belonged to an older query, was superseded by a newer job,
    /// or was cancelled.
    Stale,
    /// The job failed and the previous positions cover every node.
    FallbackPrevious,
    /// The job failed and missing nodes were placed on a grid.
    FallbackGrid,
    /// The view was unmounted while the job ran.
    Aborted,
    /// Nothing to lay out.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub id: NodeId,
    pub position: Point,
    pub style: NodeStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub from: Point,
    pub to: Point,
    pub control: Point,
    pub style: EdgeStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderScene {
    pub status: ViewStatus,
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    pub tooltip: Option<(TooltipInfo, Point)>,
    pub context_menu: Option<ContextMenu>,
}

impl RenderScene {
    pub fn node(&self, id: &NodeId) -> Option<&RenderNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&RenderEdge> {
        self.edges.iter().find(|edge| &edge.id == id)
    }
}

/// Pointer input in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Move(Point),
    Down(Point),
    Up(Point),
    RightClick(Point),
    Leave,
    Wheel { at: Point, factor: f32 },
}

#[derive(Debug, Clone)]
struct LayoutTransition {
    from: Positions,
    duration_ms: u64,
    elapsed_ms: u64,
}

pub struct GraphView {
    settings: GraphViewSettings,
    adapter: GraphDataAdapter,
    engine: LayoutEngine,
    events: EventBus,
    status: ViewStatus,
    snapshot: GraphSnapshot,
    discovered: DiscoveredWalletSet,
    styles: ResolvedStyles,
    /// Target positions of the latest applied layout.
    positions: Positions,
    transition: Option<LayoutTransition>,
    interaction: InteractionController,
    viewport: ViewportManager,
    hit_tester: HitTester,
    hit_dirty: bool,
    latest_request: RequestId,
    pending_query: Option<GraphQuery>,
    layout_cancel: Option<CancellationToken>,
    /// The job whose result will be accepted.
    current_layout: Option<LayoutTicket>,
    layout_generation: u64,
    mounted: bool,
}

impl GraphView {
    pub fn new(settings: GraphViewSettings, events: EventBus) -> Self {
        Self {
            adapter: GraphDataAdapter::new(settings.parallel_edges),
            engine: LayoutEngine::new(settings.layout.clone()),
            interaction: InteractionController::new(settings.interaction.clone(), events.clone()),
            viewport: ViewportManager::new(settings.viewport.clone()),
            hit_tester: HitTester::with_tolerance(settings.interaction.hit_tolerance),
            settings,
            events,
            status: ViewStatus::Empty,
            snapshot: GraphSnapshot::empty(),
            discovered: DiscoveredWalletSet::new(),
            styles: ResolvedStyles::default(),
            positions: Positions::new(),
            transition: None,
            hit_dirty: true,
            latest_request: RequestId::default(),
            pending_query: None,
            layout_cancel: None,
            current_layout: None,
            layout_generation: 0,
            mounted: true,
        }
    }

    /// Replaces the configured strategy with a custom one.
    pub fn set_layout_strategy(&mut self, strategy: Arc<dyn LayoutStrategy>) {
        self.engine = LayoutEngine::with_strategy(strategy, self.settings.layout.clone());
    }

    pub fn settings(&self) -> &GraphViewSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: GraphViewSettings) {
        self.adapter = GraphDataAdapter::new(settings.parallel_edges);
        self.engine = LayoutEngine::new(settings.layout.clone());
        self.interaction.set_config(settings.interaction.clone());
        self.viewport.set_config(settings.viewport.clone());
        self.hit_tester.set_edge_tolerance(settings.interaction.hit_tolerance);
        self.settings = settings;
        self.restyle();
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    pub fn styles(&self) -> &ResolvedStyles {
        &self.styles
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn interaction_mut(&mut self) -> &mut InteractionController {
        self.hit_dirty = true;
        &mut self.interaction
    }

    pub fn viewport(&self) -> &ViewportManager {
        &self.viewport
    }

    pub fn layout_engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn latest_request(&self) -> RequestId {
        self.latest_request
    }

    // ------------------------------------------------------------------------
    // Data lifecycle
    // ------------------------------------------------------------------------

    /// Registers a new query. Any in-flight layout is cancelled and results
    /// for older requests will be discarded.
    pub fn begin_query(&mut self, query: GraphQuery) -> RequestId {
        self.latest_request = self.latest_request.next();
        self.cancel_layout();
        tracing::info!(
            "Query {} for {} on {} (depth {}, limit {})",
            self.latest_request,
            query.address,
            query.chain,
            query.depth,
            query.limit
        );
        self.pending_query = Some(query);
        self.status = ViewStatus::Loading(self.latest_request);
        self.latest_request
    }

    /// Adapts a raw payload for `request_id`. Returns `Ok(false)` when the
    /// request is stale. A rejected payload clears the view to an error state.
    pub fn apply_payload(&mut self, request_id: RequestId, payload: &Value) -> GraphResult<bool> {
        if request_id != self.latest_request {
            tracing::debug!(
                "Discarding payload for stale request {} (latest {})",
                request_id,
                self.latest_request
            );
            return Ok(false);
        }
        match self.adapter.adapt_value(payload, self.pending_query.clone()) {
            Ok(snapshot) => {
                self.events.publish(Event::GraphLoaded {
                    request_id,
                    node_count: snapshot.node_count(),
                    edge_count: snapshot.edge_count(),
                    dropped_edges: snapshot.diagnostics().dangling_edges.len(),
                });
                self.set_snapshot(snapshot);
                Ok(true)
            }
            Err(err) => {
                self.fail_query(request_id, &err);
                Err(err)
            }
        }
    }

    /// Records a failed fetch or payload for `request_id`.
    pub fn fail_query(&mut self, request_id: RequestId, error: &dyn std::fmt::Display) {
        if request_id != self.latest_request {
            return;
        }
        let message = error.to_string();
        tracing::warn!("Graph request {} failed: {}", request_id, message);
        self.set_snapshot(GraphSnapshot::empty());
        self.status = ViewStatus::Error(message.clone());
        self.events.publish(Event::GraphLoadFailed {
            request_id,
            error: message,
        });
    }

    /// Swaps in `snapshot` wholesale. Positions of surviving nodes are kept
    /// as the next layout's seed.
    pub fn set_snapshot(&mut self, snapshot: GraphSnapshot) {
        self.cancel_layout();
        self.positions.retain(|id, _| snapshot.contains_node(id));
        self.transition = None;
        self.interaction.set_snapshot(snapshot.clone());
        self.status = if snapshot.is_empty() {
            ViewStatus::Empty
        } else {
            ViewStatus::LayingOut
        };
        self.snapshot = snapshot;
        self.restyle();
    }

    pub fn discovered_wallets(&self) -> &DiscoveredWalletSet {
        &self.discovered
    }

    pub fn set_discovered_wallets<I, S>(&mut self, wallets: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.discovered = wallets.into_iter().collect();
        self.restyle();
    }

    fn restyle(&mut self) {
        self.styles =
            ResolvedStyles::resolve(&self.snapshot, &self.discovered, &self.settings.encoding);
        self.hit_dirty = true;
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    fn cancel_layout(&mut self) {
        self.current_layout = None;
        if let Some(token) = self.layout_cancel.take() {
            token.cancel();
        }
    }

    /// Builds the job for the current snapshot, cancelling any previous one.
    /// Only the returned job's result will be accepted by `apply_layout`.
    pub fn prepare_layout(&mut self) -> Option<LayoutJob> {
        if self.snapshot.is_empty() {
            return None;
        }
        self.cancel_layout();
        self.layout_generation += 1;
        let cancel = CancellationToken::new();
        let job = LayoutJob {
            request_id: self.latest_request,
            generation: self.layout_generation,
            request: LayoutRequest::new(self.snapshot.clone())
                .with_pinned(self.interaction.position_overrides().clone())
                .with_seed(self.displayed_positions()),
            cancel: cancel.clone(),
        };
        self.layout_cancel = Some(cancel);
        self.current_layout = Some(job.ticket());
        Some(job)
    }

    /// Applies a finished job. Results of superseded or cancelled jobs are
    /// discarded. Other failures fall back to the previous layout or a grid
    /// and never reach the user.
    pub fn apply_layout(
        &mut self,
        ticket: LayoutTicket,
        result: GraphResult<LayoutResult>,
    ) -> LayoutApply {
        if !self.mounted {
            tracing::debug!(
                "Layout job {} dropped: {}",
                ticket,
                GraphError::RenderTargetUnavailable
            );
            return LayoutApply::Aborted;
        }
        if ticket.request_id != self.latest_request || self.current_layout != Some(ticket) {
            tracing::debug!("Discarding layout job {} (no longer current)", ticket);
            return LayoutApply::Stale;
        }
        if matches!(result, Err(GraphError::LayoutCancelled)) {
            tracing::debug!("Layout job {} was cancelled", ticket);
            return LayoutApply::Stale;
        }
        self.current_layout = None;
        self.layout_cancel = None;
        let request_id = ticket.request_id;

        match result {
            Ok(result) => {
                self.start_transition(result.positions);
                self.status = ViewStatus::Ready;
                self.events.publish(Event::LayoutCompleted {
                    request_id,
                    strategy: result.strategy.to_string(),
                    fallback: false,
                });
                LayoutApply::Applied
            }
            Err(err) => {
                tracing::warn!("Layout for request {} failed: {}", request_id, err);
                let covered = self
                    .snapshot
                    .nodes()
                    .iter()
                    .all(|node| self.positions.contains_key(&node.id));
                let (outcome, strategy) = if covered {
                    (LayoutApply::FallbackPrevious, "previous")
                } else {
                    let grid = grid_positions(&self.snapshot, &self.settings.layout);
                    for (id, p) in grid {
                        self.positions.entry(id).or_insert(p);
                    }
                    (LayoutApply::FallbackGrid, "grid")
                };
                self.hit_dirty = true;
                self.status = ViewStatus::Ready;
                self.events.publish(Event::LayoutCompleted {
                    request_id,
                    strategy: strategy.to_string(),
                    fallback: true,
                });
                outcome
            }
        }
    }

    /// Prepares, runs and applies a layout for the current snapshot.
    pub async fn run_layout(&mut self) -> LayoutApply {
        let Some(job) = self.prepare_layout() else {
            return LayoutApply::Skipped;
        };
        let ticket = job.ticket();
        let engine = self.engine.clone();
        let result = engine.run(job).await;
        self.apply_layout(ticket, result)
    }

    fn start_transition(&mut self, target: Positions) {
        let from = self.displayed_positions();
        let duration_ms = self.settings.layout.animation_duration_ms;
        self.positions = target;
        self.hit_dirty = true;
        self.transition = (duration_ms > 0 && !from.is_empty()).then_some(LayoutTransition {
            from,
            duration_ms,
            elapsed_ms: 0,
        });
    }

    /// Positions as currently drawn: the layout (mid-transition if one is
    /// running) with drag overrides on top.
    pub fn displayed_positions(&self) -> Positions {
        let mut displayed = match &self.transition {
            Some(transition) => {
                let t = ease_in_out(transition.elapsed_ms as f32 / transition.duration_ms as f32);
                self.positions
                    .iter()
                    .map(|(id, &to)| {
                        let from = transition.from.get(id).copied().unwrap_or(to);
                        (id.clone(), from.lerp(to, t))
                    })
                    .collect()
            }
            None => self.positions.clone(),
        };
        for (id, p) in self.interaction.position_overrides() {
            displayed.insert(id.clone(), *p);
        }
        displayed
    }

    pub fn position(&self, id: &NodeId) -> Option<Point> {
        self.displayed_positions().get(id).copied()
    }

    /// Advances the layout transition and the camera animation. Returns
    /// whether another frame is needed.
    pub fn tick(&mut self, elapsed_ms: u64) -> bool {
        let mut animating = self.viewport.tick(elapsed_ms);
        if let Some(transition) = self.transition.as_mut() {
            transition.elapsed_ms = transition.elapsed_ms.saturating_add(elapsed_ms);
            self.hit_dirty = true;
            if transition.elapsed_ms >= transition.duration_ms {
                self.transition = None;
            } else {
                animating = true;
            }
        }
        animating
    }

    // ------------------------------------------------------------------------
    // Mount state
    // ------------------------------------------------------------------------

    /// The render target went away. In-flight work is cancelled and its
    /// results will be dropped.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.cancel_layout();
        self.interaction.reset();
    }

    pub fn mount(&mut self) {
        self.mounted = true;
        self.hit_dirty = true;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    // ------------------------------------------------------------------------
    // Scene
    // ------------------------------------------------------------------------

    pub fn scene(&self) -> RenderScene {
        let positions = self.displayed_positions();
        let encoding = &self.settings.encoding;

        let nodes = self
            .snapshot
            .nodes()
            .iter()
            .filter_map(|node| {
                let position = *positions.get(&node.id)?;
                let base = self.styles.node(&node.id)?;
                let style = apply_node_state(base, self.interaction.node_state(&node.id), encoding);
                Some(RenderNode {
                    id: node.id.clone(),
                    position,
                    style,
                })
            })
            .collect();

        let edges = self
            .snapshot
            .edges()
            .iter()
            .filter_map(|edge| {
                let from = *positions.get(&edge.source_id)?;
                let to = *positions.get(&edge.target_id)?;
                let base = self.styles.edge(&edge.id)?;
                let style = apply_edge_state(base, self.interaction.edge_state(&edge.id), encoding);
                let control = EdgeGeometry::new(from, to, style.curvature).control_point();
                Some(RenderEdge {
                    id: edge.id.clone(),
                    source: edge.source_id.clone(),
                    target: edge.target_id.clone(),
                    from,
                    to,
                    control,
                    style,
                })
            })
            .collect();

        let tooltip = self.interaction.tooltip();
        RenderScene {
            status: self.status.clone(),
            nodes,
            edges,
            tooltip: tooltip.info().cloned().zip(tooltip.anchor()),
            context_menu: self.interaction.context_menu().cloned(),
        }
    }

    // ------------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------------

    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        self.viewport.set_size(width, height);
    }

    /// Graph-space bounds of every positioned node, including its radius.
    pub fn content_bounds(&self) -> Option<Bounds> {
        let positions = self.displayed_positions();
        Bounds::around_circles(self.snapshot.nodes().iter().filter_map(|node| {
            let p = *positions.get(&node.id)?;
            let radius = self.styles.node(&node.id).map_or(0.0, |s| s.size / 2.0);
            Some((p, radius))
        }))
    }

    pub fn fit(&mut self, padding: Option<f32>) {
        if let Some(bounds) = self.content_bounds() {
            self.viewport.fit(bounds, padding);
        }
    }

    pub fn center(&mut self) {
        if let Some(bounds) = self.content_bounds() {
            self.viewport.center(bounds);
        }
    }

    pub fn zoom_by(&mut self, factor: f32) -> f32 {
        self.viewport.zoom_by(factor)
    }

    /// Selects `id` and smoothly moves the camera onto it.
    pub fn animate_to_node(
        &mut self,
        id: &NodeId,
        zoom: Option<f32>,
        duration_ms: Option<u64>,
    ) -> GraphResult<()> {
        let position = self
            .position(id)
            .ok_or_else(|| GraphError::UnknownNode(id.clone()))?;
        self.interaction.select(Some(id.clone()));
        self.viewport.animate_to(position, zoom, duration_ms);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Pointer routing
    // ------------------------------------------------------------------------

    fn refresh_hit_tester(&mut self) {
        if !self.hit_dirty {
            return;
        }
        let positions = self.displayed_positions();
        self.hit_tester.clear();
        for node in self.snapshot.nodes() {
            if let (Some(&p), Some(style)) = (positions.get(&node.id), self.styles.node(&node.id))
            {
                self.hit_tester.insert_node(node.id.clone(), p, style.size / 2.0);
            }
        }
        for edge in self.snapshot.edges() {
            let (Some(&from), Some(&to), Some(style)) = (
                positions.get(&edge.source_id),
                positions.get(&edge.target_id),
                self.styles.edge(&edge.id),
            ) else {
                continue;
            };
            let radius = self.styles.node(&edge.source_id).map_or(0.0, |s| s.size / 2.0);
            self.hit_tester.insert_edge(
                edge.id.clone(),
                EdgeGeometry::new(from, to, style.curvature),
                radius,
            );
        }
        self.hit_dirty = false;
    }

    fn hit(&mut self, screen: Point) -> (PointerPosition, HitResult) {
        self.refresh_hit_tester();
        let graph = self.viewport.screen_to_graph(screen);
        let tolerance = self.settings.interaction.hit_tolerance / self.viewport.zoom();
        self.hit_tester.set_edge_tolerance(tolerance);
        (
            PointerPosition::new(graph, screen),
            self.hit_tester.hit_test(graph),
        )
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> GraphResult<()> {
        if !self.mounted {
            return Err(GraphError::RenderTargetUnavailable);
        }
        match event {
            PointerEvent::Move(screen) => {
                let pointer = PointerPosition::new(self.viewport.screen_to_graph(screen), screen);
                if self.interaction.pointer_move(pointer).is_some() {
                    self.hit_dirty = true;
                    return Ok(());
                }
                let (pointer, hit) = self.hit(screen);
                match hit {
                    HitResult::Node(id) => self.interaction.hover_node(&id, pointer)?,
                    HitResult::Edge(id) => self.interaction.hover_edge(&id, pointer)?,
                    HitResult::None => self.interaction.hover_clear(),
                }
            }
            PointerEvent::Down(screen) => {
                let (pointer, hit) = self.hit(screen);
                if let HitResult::Node(id) = hit {
                    let node_position = self.position(&id).unwrap_or(pointer.graph);
                    self.interaction.pointer_down(&id, pointer, node_position)?;
                }
            }
            PointerEvent::Up(screen) => {
                let supports_release = self.engine.supports_release();
                match self.interaction.pointer_up(supports_release) {
                    PointerUpOutcome::DragEnded(release) => {
                        if release.released_to_layout {
                            self.positions.insert(release.node, release.position);
                        }
                        self.hit_dirty = true;
                    }
                    PointerUpOutcome::Clicked(_) => {}
                    PointerUpOutcome::None => {
                        let (_, hit) = self.hit(screen);
                        if hit == HitResult::None {
                            self.interaction.background_click();
                        }
                    }
                }
            }
            PointerEvent::RightClick(screen) => {
                let (_, hit) = self.hit(screen);
                match hit {
                    HitResult::Node(id) => self.interaction.right_click_node(&id, screen)?,
                    _ => self.interaction.close_context_menu(),
                }
            }
            PointerEvent::Leave => self.interaction.hover_clear(),
            PointerEvent::Wheel { at, factor } => {
                self.viewport.zoom_at(factor, at);
                self.hit_dirty = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> (GraphView, EventBus) {
        let bus = EventBus::new();
        let mut settings = GraphViewSettings::default();
        settings.layout.animation_duration_ms = 0;
        (GraphView::new(settings, bus.clone()), bus)
    }

    fn payload() -> Value {
        json!({
            "nodes": [{"id": "0xA"}, {"id": "0xB"}, {"id": "0xC"}],
            "edges": [
                {"source": "0xA", "target": "0xB"},
                {"source": "0xB", "target": "0xGhost"}
            ]
        })
    }

    fn fixed_layout(view: &GraphView, request_id: RequestId) -> LayoutResult {
        LayoutResult {
            request_id,
            positions: view
                .snapshot()
                .nodes()
                .iter()
                .enumerate()
                .map(|(i, node)| (node.id.clone(), Point::new(i as f32 * 200.0, 0.0)))
                .collect(),
            strategy: "fixed",
            elapsed: std::time::Duration::ZERO,
        }
    }

    #[test]
    fn test_payload_lifecycle_and_events() {
        let (mut view, bus) = view();
        let id = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        assert_eq!(view.status(), &ViewStatus::Loading(id));

        assert!(view.apply_payload(id, &payload()).unwrap());
        assert_eq!(view.status(), &ViewStatus::LayingOut);
        assert_eq!(view.snapshot().edge_count(), 1);
        assert!(view.scene().nodes.is_empty());

        let ticket = view.prepare_layout().unwrap().ticket();
        let result = fixed_layout(&view, id);
        assert_eq!(view.apply_layout(ticket, Ok(result)), LayoutApply::Applied);
        assert_eq!(view.status(), &ViewStatus::Ready);
        let scene = view.scene();
        assert_eq!(scene.nodes.len(), 3);
        assert_eq!(scene.edges.len(), 1);

        let events = bus.drain();
        assert!(matches!(
            events[0],
            Event::GraphLoaded { node_count: 3, edge_count: 1, dropped_edges: 1, .. }
        ));
        assert!(matches!(events[1], Event::LayoutCompleted { fallback: false, .. }));
    }

    #[test]
    fn test_invalid_payload_renders_error_state() {
        let (mut view, bus) = view();
        let first = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(first, &payload()).unwrap();

        let second = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        let err = view.apply_payload(second, &json!({"edges": []})).unwrap_err();
        assert!(err.is_user_facing());
        assert!(matches!(view.status(), ViewStatus::Error(_)));
        assert!(view.snapshot().is_empty());
        assert!(view.scene().nodes.is_empty());
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, Event::GraphLoadFailed { request_id, .. } if *request_id == second)));
    }

    #[test]
    fn test_stale_payload_and_layout_are_discarded() {
        let (mut view, _) = view();
        let old = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(old, &payload()).unwrap();
        let old_job = view.prepare_layout().unwrap();

        let new = view.begin_query(GraphQuery::new("0xB", "ethereum"));
        assert!(old_job.cancel.is_cancelled());
        assert_eq!(view.apply_payload(old, &payload()), Ok(false));

        let stale = fixed_layout(&view, old);
        assert_eq!(view.apply_layout(old_job.ticket(), Ok(stale)), LayoutApply::Stale);
        assert_eq!(view.status(), &ViewStatus::Loading(new));
    }

    #[test]
    fn test_superseded_job_in_same_request_is_discarded() {
        let (mut view, bus) = view();
        let id = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(id, &payload()).unwrap();
        bus.drain();

        let first = view.prepare_layout().unwrap();
        let second = view.prepare_layout().unwrap();
        assert!(first.cancel.is_cancelled());
        assert_eq!(first.request_id, second.request_id);
        assert_ne!(first.ticket(), second.ticket());

        assert_eq!(
            view.apply_layout(first.ticket(), Err(GraphError::LayoutCancelled)),
            LayoutApply::Stale
        );
        let late = fixed_layout(&view, id);
        assert_eq!(view.apply_layout(first.ticket(), Ok(late)), LayoutApply::Stale);
        assert_eq!(view.status(), &ViewStatus::LayingOut);
        assert!(view.scene().nodes.is_empty());
        assert!(bus.drain().is_empty());

        let mut current = fixed_layout(&view, id);
        for p in current.positions.values_mut() {
            p.y = 40.0;
        }
        assert_eq!(view.apply_layout(second.ticket(), Ok(current)), LayoutApply::Applied);
        assert_eq!(view.position(&NodeId::from("0xA")).unwrap().y, 40.0);
        let repeat = Err(GraphError::LayoutTimeout { budget_ms: 1 });
        assert_eq!(view.apply_layout(second.ticket(), repeat), LayoutApply::Stale);
    }

    #[test]
    fn test_cancelled_current_job_never_falls_back() {
        let (mut view, bus) = view();
        let id = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(id, &payload()).unwrap();
        bus.drain();

        let job = view.prepare_layout().unwrap();
        assert_eq!(
            view.apply_layout(job.ticket(), Err(GraphError::LayoutCancelled)),
            LayoutApply::Stale
        );
        assert_eq!(view.status(), &ViewStatus::LayingOut);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_layout_failure_falls_back() {
        let (mut view, bus) = view();
        let id = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(id, &payload()).unwrap();

        let timeout: GraphResult<LayoutResult> = Err(GraphError::LayoutTimeout { budget_ms: 10 });
        let first = view.prepare_layout().unwrap().ticket();
        assert_eq!(view.apply_layout(first, timeout.clone()), LayoutApply::FallbackGrid);
        assert_eq!(view.scene().nodes.len(), 3);
        let second = view.prepare_layout().unwrap().ticket();
        assert_eq!(view.apply_layout(second, timeout), LayoutApply::FallbackPrevious);
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, Event::LayoutCompleted { fallback: true, .. })));
    }

    #[test]
    fn test_unmounted_view_aborts_silently() {
        let (mut view, _) = view();
        let id = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(id, &payload()).unwrap();
        let job = view.prepare_layout().unwrap();

        view.unmount();
        assert!(job.cancel.is_cancelled());
        let result = fixed_layout(&view, id);
        assert_eq!(view.apply_layout(job.ticket(), Ok(result)), LayoutApply::Aborted);
        assert_eq!(
            view.handle_pointer(PointerEvent::Leave),
            Err(GraphError::RenderTargetUnavailable)
        );
    }

    #[test]
    fn test_pointer_hover_and_click_through_hit_testing() {
        let (mut view, bus) = view();
        let id = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(id, &payload()).unwrap();
        let ticket = view.prepare_layout().unwrap().ticket();
        let result = fixed_layout(&view, id);
        view.apply_layout(ticket, Ok(result));
        bus.drain();

        let a = NodeId::from("0xA");
        let screen = view.viewport().graph_to_screen(view.position(&a).unwrap());
        view.handle_pointer(PointerEvent::Move(screen)).unwrap();
        assert_eq!(view.interaction().hovered_node(), Some(&a));
        assert!(view.scene().tooltip.is_some());

        view.handle_pointer(PointerEvent::Down(screen)).unwrap();
        view.handle_pointer(PointerEvent::Up(screen)).unwrap();
        assert_eq!(view.interaction().selected(), Some(&a));

        let far = Point::new(-5000.0, -5000.0);
        view.handle_pointer(PointerEvent::Move(far)).unwrap();
        view.handle_pointer(PointerEvent::Down(far)).unwrap();
        view.handle_pointer(PointerEvent::Up(far)).unwrap();
        assert_eq!(view.interaction().selected(), None);
        assert!(view.scene().tooltip.is_none());
    }

    #[test]
    fn test_discovered_wallets_restyle() {
        let (mut view, _) = view();
        let id = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(id, &payload()).unwrap();
        let b = NodeId::from("0xB");
        let before = view.styles().node(&b).unwrap().fill;

        view.set_discovered_wallets(["0xb"]);
        let after = view.styles().node(&b).unwrap();
        assert_ne!(after.fill, before);
        assert_eq!(after.fill, view.settings().encoding.palette.discovered);
        assert_eq!(after.badge, Some(crate::style::DISCOVERED_BADGE));
    }

    #[test]
    fn test_animate_to_node_selects_and_moves_camera() {
        let (mut view, _) = view();
        let id = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(id, &payload()).unwrap();
        let ticket = view.prepare_layout().unwrap().ticket();
        let result = fixed_layout(&view, id);
        view.apply_layout(ticket, Ok(result));

        let c = NodeId::from("0xC");
        view.animate_to_node(&c, Some(2.0), Some(300)).unwrap();
        assert_eq!(view.interaction().selected(), Some(&c));
        while view.tick(16) {}
        assert_eq!(view.viewport().camera().center, view.position(&c).unwrap());
        assert_eq!(view.viewport().zoom(), 2.0);

        assert!(view.animate_to_node(&NodeId::from("0xZ"), None, None).is_err());
    }

    #[test]
    fn test_layout_transition_interpolates() {
        let bus = EventBus::new();
        let mut view = GraphView::new(GraphViewSettings::default(), bus);
        let id = view.begin_query(GraphQuery::new("0xA", "ethereum"));
        view.apply_payload(id, &payload()).unwrap();
        // First layout has nothing to animate from.
        let first = fixed_layout(&view, id);
        let ticket = view.prepare_layout().unwrap().ticket();
        view.apply_layout(ticket, Ok(first.clone()));
        assert!(!view.tick(0));

        let mut moved = first;
        for p in moved.positions.values_mut() {
            p.y += 100.0;
        }
        let ticket = view.prepare_layout().unwrap().ticket();
        view.apply_layout(ticket, Ok(moved));
        let a = NodeId::from("0xA");
        assert_eq!(view.position(&a).unwrap().y, 0.0);
        assert!(view.tick(250));
        let mid = view.position(&a).unwrap().y;
        assert!(mid > 0.0 && mid < 100.0);
        while view.tick(100) {}
        assert_eq!(view.position(&a).unwrap().y, 100.0);
    }
}
