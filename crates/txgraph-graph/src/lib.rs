pub mod adapter;
pub mod cancellation;
pub mod hit_tester;
pub mod interaction;
pub mod layout;
pub mod raw;
pub mod settings;
pub mod snapshot;
pub mod style;
pub mod tooltip;
pub mod view;
pub mod viewport;

pub use adapter::{
    DEFAULT_CONFIDENCE_SCORE, DEFAULT_TOTAL_VOLUME_USD, DEFAULT_TRANSACTION_COUNT,
    DanglingEdgeWarning, GraphDataAdapter, ParallelEdgePolicy,
};
pub use cancellation::CancellationToken;
pub use hit_tester::{EdgeGeometry, HitResult, HitTester};
pub use interaction::{
    ContextMenu, DragRelease, HighlightState, InteractionConfig, InteractionController,
    InteractionState, PointerPosition, PointerUpOutcome,
};
pub use layout::{
    ForceDirectedLayout, ForceParams, GridLayout, HierarchicalLayout, LayoutConfig, LayoutEngine,
    LayoutJob, LayoutRequest, LayoutResult, LayoutStrategy, LayoutStrategyKind, LayoutTicket,
    Positions, grid_positions,
};
pub use raw::{RawEdge, RawGraphPayload, RawNode};
pub use settings::GraphViewSettings;
pub use snapshot::{GraphSnapshot, SnapshotDiagnostics};
pub use style::{
    Color, EdgeState, EdgeStyle, EncodingConfig, NodeState, NodeStyle, Palette, ResolvedStyles,
    border_width, edge_color, edge_width, node_color, node_opacity, node_size,
};
pub use tooltip::{TooltipInfo, TooltipManager, format_usd};
pub use view::{
    GraphView, LayoutApply, PointerEvent, RenderEdge, RenderNode, RenderScene, ViewStatus,
};
pub use viewport::{Bounds, Camera, CameraAnimation, ViewportConfig, ViewportManager};
