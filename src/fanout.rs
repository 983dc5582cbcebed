use std::future::Future;
use tokio::task::JoinSet;
use tracing::warn;

/// Run every task concurrently and wait for all of them.
///
/// Output is in input order regardless of completion order. A task that panics
/// leaves `None` in its slot; the others are unaffected. Tasks are expected to
/// turn their own errors into values.
pub async fn join_ordered<T, Fut>(tasks: Vec<Fut>) -> Vec<Option<T>>
where
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut results: Vec<Option<T>> = (0..tasks.len()).map(|_| None).collect();
    let mut set = JoinSet::new();
    for (i, task) in tasks.into_iter().enumerate() {
        set.spawn(async move { (i, task.await) });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((i, value)) => results[i] = Some(value),
            Err(e) => warn!("Fan-out task did not finish: {}", e),
        }
    }

    results
}
