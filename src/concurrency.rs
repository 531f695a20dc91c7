//! Bounded fan-out for async jobs.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Runs `f` over every item with at most `limit` futures in flight.
///
/// A new item starts as soon as any running one finishes. Results come back
/// in input order regardless of completion order. A `limit` of 0 is treated
/// as 1.
///
/// # Example
///
/// ```
/// use iocscan::concurrency::run_with_concurrency;
///
/// #[tokio::main]
/// async fn main() {
///     let doubled = run_with_concurrency(vec![1, 2, 3], 2, |n| async move { n * 2 }).await;
///     assert_eq!(doubled, vec![2, 4, 6]);
/// }
/// ```
pub async fn run_with_concurrency<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }
    let limit = limit.clamp(1, total);

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();

    let mut completed = stream::iter(items.into_iter().enumerate())
        .map(|(idx, item)| {
            let fut = f(item);
            async move { (idx, fut.await) }
        })
        .buffer_unordered(limit);

    while let Some((idx, result)) = completed.next().await {
        slots[idx] = Some(result);
    }

    slots.into_iter().flatten().collect()
}
