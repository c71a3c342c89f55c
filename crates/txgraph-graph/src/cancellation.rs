use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use txgraph_core::{GraphError, GraphResult};

/// Cooperative cancellation flag shared between a view and its in-flight
/// layout job. A newer query cancels the previous job's token.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `Err(LayoutCancelled)` once cancellation was requested.
    pub fn check(&self) -> GraphResult<()> {
        if self.is_cancelled() {
            Err(GraphError::LayoutCancelled)
        } else {
            Ok(())
        }
    }
}
