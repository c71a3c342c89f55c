use crate::{EdgeId, NodeId};
use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

/// Failures raised by the graph pipeline.
///
/// Only [`GraphError::DataValidation`] is meant to reach the user. The rest
/// are recovered by the component that observes them and logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Malformed graph payload: {0}")]
    DataValidation(String),

    #[error("Edge {edge} references unknown node {missing}")]
    DanglingEdge { edge: EdgeId, missing: NodeId },

    #[error("Layout did not finish within {budget_ms} ms")]
    LayoutTimeout { budget_ms: u64 },

    #[error("Layout computation was cancelled")]
    LayoutCancelled,

    #[error("Layout worker failed: {0}")]
    LayoutFailed(String),

    #[error("Render target is no longer available")]
    RenderTargetUnavailable,

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeId),

    #[error("Invalid settings: {0}")]
    Settings(String),
}

impl GraphError {
    /// Whether the error should be shown to the user rather than recovered.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, GraphError::DataValidation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_validation_is_user_facing() {
        assert!(GraphError::DataValidation("nodes missing".into()).is_user_facing());
        assert!(!GraphError::LayoutTimeout { budget_ms: 10 }.is_user_facing());
        assert!(!GraphError::RenderTargetUnavailable.is_user_facing());
        assert!(!GraphError::LayoutFailed("worker panicked".into()).is_user_facing());
        assert!(
            !GraphError::DanglingEdge {
                edge: EdgeId::from("e1"),
                missing: NodeId::from("0xZ"),
            }
            .is_user_facing()
        );
    }

    #[test]
    fn test_messages() {
        let err = GraphError::DanglingEdge {
            edge: EdgeId::from("e1"),
            missing: NodeId::from("0xZ"),
        };
        assert_eq!(err.to_string(), "Edge e1 references unknown node 0xZ");
    }
}
