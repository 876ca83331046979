//! Concurrent map-then-join that preserves input order.

use std::future::Future;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;

/// The branch of a fan-out that failed first.
#[derive(Debug, thiserror::Error)]
#[error("branch {index} of {width} failed: {source}")]
pub struct FanOutError<E> {
    /// Input position of the failed branch.
    pub index: usize,
    /// Number of branches in the fan-out.
    pub width: usize,
    #[source]
    pub source: E,
}

impl<E> FanOutError<E> {
    pub fn into_source(self) -> E {
        self.source
    }
}

/// Run `op` over every item concurrently and collect the results in input order.
///
/// Every invocation is started before any is awaited, and all of them are
/// polled from the caller's task. `result[i]` is always the output of
/// `op(items[i])`, whatever order the invocations finish in.
///
/// The first failure to be observed ends the fan-out. That is the first branch
/// to fail in time, not necessarily the lowest index. Branches still in flight
/// are dropped with the combinator, so nothing keeps running after it returns.
///
/// An empty input resolves immediately without calling `op`.
pub async fn fan_out<I, F, Fut, R, E>(items: I, mut op: F) -> Result<Vec<R>, FanOutError<E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut pending: FuturesUnordered<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let branch = op(item);
            async move { (index, branch.await) }
        })
        .collect();

    let width = pending.len();
    let mut slots: Vec<Option<R>> = Vec::with_capacity(width);
    slots.resize_with(width, || None);

    while let Some((index, outcome)) = pending.next().await {
        match outcome {
            Ok(value) => slots[index] = Some(value),
            Err(source) => {
                tracing::debug!(index, width, in_flight = pending.len(), "Fan-out branch failed");
                return Err(FanOutError {
                    index,
                    width,
                    source,
                });
            }
        }
    }

    // Every branch finished successfully, so every slot is filled.
    let results: Vec<R> = slots.into_iter().flatten().collect();
    debug_assert_eq!(results.len(), width);
    Ok(results)
}
