use futures::stream::{Fuse, FusedStream, FuturesUnordered};
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Stream adapter that turns every item of the source stream into a
    /// future via `worker`, keeping at most `width` of those futures in
    /// flight at any time.
    ///
    /// Outputs are yielded in completion order, not source order. New work is
    /// only pulled from the source once a slot frees up, so an unbounded (or
    /// still-being-discovered) source never causes unbounded concurrency.
    ///
    /// Equivalent to `map(worker).buffer_unordered(width)`.
    #[must_use = "streams do nothing unless polled"]
    pub struct Bounded<St, F, Fut>
    where
        St: Stream,
    {
        #[pin]
        source: Fuse<St>,
        in_flight: FuturesUnordered<Fut>,
        worker: F,
        width: usize,
    }
}

impl<St, F, Fut> Bounded<St, F, Fut>
where
    St: Stream,
    F: FnMut(St::Item) -> Fut,
    Fut: Future,
{
    pub(crate) fn new(source: St, width: usize, worker: F) -> Self {
        Self {
            source: source.fuse(),
            in_flight: FuturesUnordered::new(),
            worker,
            // A pool of zero workers would never make progress.
            width: width.max(1),
        }
    }

    /// Number of work items currently being processed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl<St, F, Fut> Stream for Bounded<St, F, Fut>
where
    St: Stream,
    F: FnMut(St::Item) -> Fut,
    Fut: Future,
{
    type Item = Fut::Output;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Top up the pool before polling it: FIFO intake, bounded width.
        while this.in_flight.len() < *this.width {
            match this.source.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => this.in_flight.push((this.worker)(item)),
                Poll::Ready(None) | Poll::Pending => break,
            }
        }

        match this.in_flight.poll_next_unpin(cx) {
            Poll::Ready(Some(output)) => Poll::Ready(Some(output)),
            // Nothing in flight. Either the source is exhausted (we're done)
            // or it returned Pending above and has registered the waker.
            Poll::Ready(None) if this.source.is_terminated() => Poll::Ready(None),
            Poll::Ready(None) | Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let queued = self.in_flight.len();
        let (lower, upper) = self.source.size_hint();
        (lower.saturating_add(queued), upper.and_then(|u| u.checked_add(queued)))
    }
}

impl<St, F, Fut> FusedStream for Bounded<St, F, Fut>
where
    St: Stream,
    F: FnMut(St::Item) -> Fut,
    Fut: Future,
{
    fn is_terminated(&self) -> bool {
        self.source.is_terminated() && self.in_flight.is_empty()
    }
}

/// Extension trait adding [`bounded`](BoundedExt::bounded) to every [`Stream`].
pub trait BoundedExt: Stream + Sized {
    /// Process every item with `worker`, at most `width` at a time.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::{StreamExt, stream};
    /// use gop_asyncutils::BoundedExt;
    ///
    /// # futures::executor::block_on(async {
    /// let mut doubled: Vec<u32> = stream::iter(1..=4)
    ///     .bounded(2, |n| async move { n * 2 })
    ///     .collect()
    ///     .await;
    /// doubled.sort();
    /// assert_eq!(doubled, vec![2, 4, 6, 8]);
    /// # });
    /// ```
    fn bounded<F, Fut>(self, width: usize, worker: F) -> Bounded<Self, F, Fut>
    where
        F: FnMut(Self::Item) -> Fut,
        Fut: Future,
    {
        Bounded::new(self, width, worker)
    }
}

impl<St: Stream> BoundedExt for St {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_items_processed() {
        let mut results: Vec<u32> = stream::iter(0..50).bounded(8, |n| async move { n + 1 }).collect().await;
        results.sort_unstable();
        assert_eq!(results, (1..=50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_source() {
        let results: Vec<u32> = stream::iter(Vec::<u32>::new()).bounded(4, |n| async move { n }).collect().await;
        assert!(results.is_empty());
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(8)]
    #[tokio::test]
    async fn test_width_is_never_exceeded(#[case] width: usize) {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let results: Vec<()> = stream::iter(0..40)
            .bounded(width, |_| {
                let active = active.clone();
                let peak = peak.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .collect()
            .await;
        assert_eq!(results.len(), 40);
        assert!(peak.load(Ordering::SeqCst) <= width);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_zero_width_still_progresses() {
        let results: Vec<u8> = stream::iter([1u8, 2, 3]).bounded(0, |n| async move { n }).collect().await;
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_terminated_after_drain() {
        let mut pool = stream::iter([1u8]).bounded(2, |n| async move { n });
        assert!(!pool.is_terminated());
        assert_eq!(pool.next().await, Some(1));
        assert_eq!(pool.next().await, None);
        assert!(pool.is_terminated());
        assert_eq!(pool.in_flight(), 0);
    }
}
