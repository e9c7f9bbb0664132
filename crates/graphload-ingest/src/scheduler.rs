//! Bounded upload scheduler
//!
//! Runs one upload future per entity type with at most `max_concurrency` in
//! flight, using `buffer_unordered`: as soon as one type finishes the next
//! queued type starts. Records inside a type stay sequential.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{error, info};

use crate::executor::{upload_entity, EntityPlan, UploadContext, UploadSummary};
use crate::store::GraphStore;

/// Drive `upload_one` over every item with bounded concurrency
///
/// Results come back in completion order. Returns once every future has
/// finished.
pub async fn run_all<T, F, Fut>(
    items: impl IntoIterator<Item = T>,
    max_concurrency: usize,
    upload_one: F,
) -> Vec<Fut::Output>
where
    F: FnMut(T) -> Fut,
    Fut: Future,
{
    stream::iter(items)
        .map(upload_one)
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await
}

/// Upload a set of entity types and wait for all of them
///
/// A type that fails as a whole is logged and written to the error sink; the
/// remaining types carry on.
pub async fn run_phase<S>(
    ctx: &UploadContext<'_, S>,
    plans: Vec<EntityPlan<'_>>,
    max_concurrency: usize,
) -> Vec<UploadSummary>
where
    S: GraphStore + ?Sized,
{
    let total = plans.len();
    info!(
        "Uploading {} entity types (concurrency={})",
        total, max_concurrency
    );

    let results = run_all(plans, max_concurrency, |plan| async move {
        let result = upload_entity(ctx, &plan).await;
        (plan.name(), result)
    })
    .await;

    let mut summaries = Vec::with_capacity(total);
    for (name, result) in results {
        match result {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                let detail = format!("{:#}", e);
                error!(entity = %name, error = %detail, "Entity upload failed");
                ctx.sink.record_failure(name, &detail, &[]);
            },
        }
    }

    info!("{} / {} entity types completed", summaries.len(), total);
    summaries
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let finished = Mutex::new(Vec::new());

        let results = run_all(0..10u64, 3, |i| {
            let (active, peak, finished) = (&active, &peak, &finished);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10 + i % 4)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                finished.lock().unwrap().push(i);
                i
            }
        })
        .await;

        assert_eq!(results.len(), 10);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(active.load(Ordering::SeqCst), 0);

        let mut finished = finished.into_inner().unwrap();
        finished.sort();
        assert_eq!(finished, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs() {
        let results = run_all(vec![1, 2, 3], 0, |i| async move { i * 2 }).await;
        assert_eq!(results.iter().sum::<i32>(), 12);
    }
}
