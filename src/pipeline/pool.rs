use futures::future;
use futures::stream::{self, LocalBoxStream, StreamExt};
use std::future::Future;

/// Drive `work` over `items` with at most `workers` futures in flight.
///
/// Items are claimed in order; `should_stop` is checked before every claim
/// and, once true, no further items are started. Work already in flight
/// still runs to completion. Results arrive in completion order tagged with
/// the item's index, so a single consumer can merge them.
pub fn run_bounded<'a, T, R, F, Fut, S>(
    items: Vec<T>,
    workers: usize,
    should_stop: S,
    mut work: F,
) -> LocalBoxStream<'a, (usize, R)>
where
    T: 'a,
    R: 'a,
    F: FnMut(usize, T) -> Fut + 'a,
    Fut: Future<Output = R> + 'a,
    S: Fn() -> bool + 'a,
{
    stream::iter(items.into_iter().enumerate())
        .take_while(move |_| future::ready(!should_stop()))
        .map(move |(idx, item)| {
            let fut = work(idx, item);
            async move { (idx, fut.await) }
        })
        .buffer_unordered(workers.max(1))
        .boxed_local()
}
