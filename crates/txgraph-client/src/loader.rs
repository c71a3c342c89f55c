use crate::GraphSource;
use parking_lot::Mutex;
use txgraph_core::GraphQuery;
use txgraph_graph::{GraphView, LayoutApply};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The payload was adapted and a layout job ran.
    Loaded(LayoutApply),
    /// A newer query took over while this one was in flight.
    Stale,
    /// Fetch or validation failed. The view shows the error.
    Failed(String),
}

/// Runs one query end to end: fetch, adapt, lay out.
///
/// The view is locked only between awaits. Pointer input and newer queries
/// reach it while the fetch and the layout job run, and a load overtaken by
/// a newer query returns [`LoadOutcome::Stale`].
pub async fn load_graph<S>(view: &Mutex<GraphView>, source: &S, query: GraphQuery) -> LoadOutcome
where
    S: GraphSource + ?Sized,
{
    let request_id = view.lock().begin_query(query.clone());
    let fetched = source.fetch(&query).await;

    let (job, engine) = {
        let mut guard = view.lock();
        if guard.latest_request() != request_id {
            tracing::debug!("Load for request {} overtaken during fetch", request_id);
            return LoadOutcome::Stale;
        }
        let payload = match fetched {
            Ok(payload) => payload,
            Err(err) => {
                guard.fail_query(request_id, &err);
                return LoadOutcome::Failed(err.to_string());
            }
        };
        match guard.apply_payload(request_id, &payload) {
            Ok(true) => {}
            Ok(false) => return LoadOutcome::Stale,
            Err(err) => return LoadOutcome::Failed(err.to_string()),
        }
        let Some(job) = guard.prepare_layout() else {
            return LoadOutcome::Loaded(LayoutApply::Skipped);
        };
        (job, guard.layout_engine().clone())
    };

    let ticket = job.ticket();
    let result = engine.run(job).await;

    let mut guard = view.lock();
    let applied = guard.apply_layout(ticket, result);
    if guard.latest_request() != request_id {
        tracing::debug!("Load for request {} overtaken during layout", request_id);
        return LoadOutcome::Stale;
    }
    LoadOutcome::Loaded(applied)
}
