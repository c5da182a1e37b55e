//! Bounded concurrent dispatch of per-source fetches
//!
//! At most `max_parallelism` fetches run at a time. When the ceiling is
//! reached the dispatcher waits for one fetch to finish, records its outcome
//! and launches the next queued source in its place. A failed fetch is just
//! another outcome; only caller cancellation stops the dispatch.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::source::Source;
use crate::version::error::{FeedError, ResolveError};
use crate::version::types::{FetchOutcome, SourceOutcome};

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "fetch panicked".to_string())
}

/// Wait for the next in-flight fetch, aborting everything on cancellation
async fn next_completed(
    in_flight: &mut JoinSet<SourceOutcome>,
    cancel: &CancellationToken,
) -> Result<Option<SourceOutcome>, ResolveError> {
    let next = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        joined = in_flight.join_next() => Some(joined),
    };

    let Some(joined) = next else {
        debug!("Dispatch cancelled with {} fetches in flight", in_flight.len());
        in_flight.shutdown().await;
        return Err(ResolveError::Cancelled);
    };

    match joined {
        Some(Ok(outcome)) => Ok(Some(outcome)),
        Some(Err(e)) => {
            // Panics are caught inside the task, so only an abort lands here
            error!("Fetch task ended without an outcome: {}", e);
            Err(ResolveError::Cancelled)
        }
        None => Ok(None),
    }
}

/// Run `fetch` once per source with at most `max_parallelism` fetches in flight.
///
/// Returns exactly one [`SourceOutcome`] per input source, in completion
/// order. A panicking fetch is recorded as [`FetchOutcome::Failed`] for its
/// source. Cancelling `cancel` cancels the token handed to every fetch, aborts
/// the in-flight ones and returns [`ResolveError::Cancelled`].
pub async fn dispatch<F, Fut>(
    sources: Vec<Source>,
    max_parallelism: usize,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Result<Vec<SourceOutcome>, ResolveError>
where
    F: FnMut(Source, CancellationToken) -> Fut,
    Fut: Future<Output = FetchOutcome> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(ResolveError::Cancelled);
    }

    let total = sources.len();
    let limit = max_parallelism.min(total).max(1);
    debug!("Dispatching {} sources with parallelism {}", total, limit);

    let fetch_cancel = cancel.child_token();
    let mut in_flight: JoinSet<SourceOutcome> = JoinSet::new();
    let mut outcomes = Vec::with_capacity(total);

    for source in sources {
        if in_flight.len() >= limit
            && let Some(outcome) = next_completed(&mut in_flight, cancel).await?
        {
            outcomes.push(outcome);
        }

        let task = panic::catch_unwind(AssertUnwindSafe(|| {
            fetch(source.clone(), fetch_cancel.clone())
        }))
        .map(|fut| AssertUnwindSafe(fut).catch_unwind());
        in_flight.spawn(async move {
            let result = match task {
                Ok(fut) => fut.await,
                Err(payload) => Err(payload),
            };
            let outcome = result.unwrap_or_else(|payload| {
                let message = panic_message(payload);
                warn!("Fetch for {} panicked: {}", source, message);
                FetchOutcome::Failed(FeedError::TaskFailed(message))
            });
            SourceOutcome { source, outcome }
        });
    }

    while let Some(outcome) = next_completed(&mut in_flight, cancel).await? {
        outcomes.push(outcome);
    }

    debug!("Collected {} outcomes for {} sources", outcomes.len(), total);
    Ok(outcomes)
}
