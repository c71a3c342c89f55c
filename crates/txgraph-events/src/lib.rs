use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use txgraph_core::{GraphEdge, GraphNode, RequestId};

/// Actions offered by the node context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextMenuAction {
    Track,
    Expand,
    ShowFlow,
    Export,
}

impl ContextMenuAction {
    pub const ALL: [ContextMenuAction; 4] = [
        ContextMenuAction::Track,
        ContextMenuAction::Expand,
        ContextMenuAction::ShowFlow,
        ContextMenuAction::Export,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ContextMenuAction::Track => "Track wallet",
            ContextMenuAction::Expand => "Expand neighborhood",
            ContextMenuAction::ShowFlow => "Show flow",
            ContextMenuAction::Export => "Export",
        }
    }
}

/// Hovered edge together with its endpoints, as handed to hover callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub edge: GraphEdge,
    pub source: GraphNode,
    pub target: GraphNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HoverTarget {
    Node(GraphNode),
    Edge(EdgeInfo),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Interaction callbacks
    NodeClicked {
        node: GraphNode,
    },
    /// `None` when the pointer left the hovered element.
    NodeHovered {
        target: Option<HoverTarget>,
    },
    ContextMenuAction {
        action: ContextMenuAction,
        node: GraphNode,
    },

    // Data lifecycle
    GraphLoaded {
        request_id: RequestId,
        node_count: usize,
        edge_count: usize,
        dropped_edges: usize,
    },
    GraphLoadFailed {
        request_id: RequestId,
        error: String,
    },
    LayoutCompleted {
        request_id: RequestId,
        strategy: String,
        fallback: bool,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Event bus has no receivers, dropping event");
        }
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for page-level containers that respond to graph events.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        let sender = bus.sender();
        let receiver = bus.receiver();

        let node = GraphNode::new("0xA");
        sender
            .send(Event::NodeClicked { node: node.clone() })
            .unwrap();

        match receiver.recv().unwrap() {
            Event::NodeClicked { node: received } => assert_eq!(received, node),
            other => panic!("Expected NodeClicked, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_to_listener() {
        struct Recorder(Vec<Event>);
        impl EventListener for Recorder {
            fn handle_event(&mut self, event: &Event) {
                self.0.push(event.clone());
            }
        }

        let bus = EventBus::new();
        bus.publish(Event::NodeHovered { target: None });
        bus.publish(Event::ContextMenuAction {
            action: ContextMenuAction::Track,
            node: GraphNode::new("0xA"),
        });

        let mut recorder = Recorder(Vec::new());
        bus.dispatch_to(&mut recorder);

        assert_eq!(recorder.0.len(), 2);
        assert!(matches!(recorder.0[0], Event::NodeHovered { target: None }));
        assert!(bus.drain().is_empty());
    }
}
