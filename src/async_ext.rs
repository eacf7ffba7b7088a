//! §5's three intrinsically-asynchronous facilities: `to_async_sequence`,
//! `first_async`, and `interval`. Gated behind the `tokio` feature, the way
//! `leptos_reactive`'s own `spawn.rs` keeps its executor integration behind
//! feature flags rather than hard-wiring one runtime.

use std::rc::Rc;

use futures::channel::mpsc;
use futures::{FutureExt, StreamExt};

use crate::error::{ObservableError, Result};
use crate::subject::Subject;

/// `to_async_sequence(observable)` (§5): an unbounded, single-reader FIFO
/// fed by `on_next`. The async consumer suspends on empty and resumes on
/// either a new value or stream completion.
pub fn to_async_sequence<T>(source: &Subject<T>) -> impl futures::Stream<Item = T> + Unpin
where
    T: Clone + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded();
    let tx_for_values = tx.clone();
    source.subscribe(move |value: &T| {
        let _ = tx_for_values.unbounded_send(value.clone());
    });
    // Without this, `tx` only ever closes when the subject itself drops
    // its subscriber list, so `rx` would suspend forever once the source
    // completes or errors instead of ending the sequence.
    source.subscribe_terminal(move |_terminal| {
        tx.close_channel();
    });
    rx
}

/// `first_async(observable, cancellation)` (§5): completes with the first
/// value produced; fails with `EmptySequence` if the source completes
/// first; resolves to `None` (the task is treated as canceled, not
/// failed) if `cancellation` fires first.
pub async fn first_async<T>(source: &Subject<T>, cancellation: CancellationToken) -> Result<Option<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let mut stream = to_async_sequence(source);
    futures::select_biased! {
        _ = cancellation.cancelled().fuse() => Ok(None),
        value = stream.next().fuse() => value.map(Some).ok_or(ObservableError::EmptySequence),
    }
}

/// A disposable cancellation signal for `first_async`/`interval`: dropping
/// every clone without calling [`CancellationToken::cancel`] leaves the
/// `cancelled` future pending forever, which is fine since `select_biased!`
/// only polls it alongside the real work.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Rc<tokio::sync::Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self { inner: Rc::new(tokio::sync::Notify::new()) }
    }

    pub fn cancel(&self) {
        self.inner.notify_waiters();
    }

    pub async fn cancelled(&self) {
        self.inner.notified().await;
    }
}

/// `interval(period)` (§5): fires `on_next(i)` with monotonically
/// increasing `i` on each tick. Cancel by dropping the returned
/// [`crate::subject::Subscription`]'s subject (`dispose`).
pub fn interval(period: std::time::Duration) -> Subject<u64> {
    let subject: Subject<u64> = Subject::new();
    let out = subject.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        let mut i: u64 = 0;
        loop {
            ticker.tick().await;
            if out.is_terminated() {
                break;
            }
            out.on_next(i);
            i += 1;
        }
    });
    subject
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn first_async_resolves_to_first_value() {
        let subject: Subject<i32> = Subject::new();
        let cancellation = CancellationToken::new();
        let handle = {
            let subject = subject.clone();
            tokio::spawn(async move { first_async(&subject, cancellation).await })
        };
        tokio::task::yield_now().await;
        subject.on_next(42);
        let value = handle.await.unwrap().unwrap();
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn first_async_on_empty_completion_errs() {
        let subject: Subject<i32> = Subject::new();
        let cancellation = CancellationToken::new();
        let handle = {
            let subject = subject.clone();
            tokio::spawn(async move { first_async(&subject, cancellation).await })
        };
        tokio::task::yield_now().await;
        subject.on_completed();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ObservableError::EmptySequence)));
    }

    #[tokio::test]
    async fn first_async_canceled_before_any_value_resolves_to_none() {
        let subject: Subject<i32> = Subject::new();
        let cancellation = CancellationToken::new();
        let cancellation2 = cancellation.clone();
        let handle = tokio::spawn(async move { first_async(&subject, cancellation2).await });
        tokio::task::yield_now().await;
        cancellation.cancel();
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn interval_ticks_with_increasing_index() {
        let subject = interval(std::time::Duration::from_millis(5));
        let mut stream = to_async_sequence(&subject);
        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(second, first + 1);
        subject.dispose();
    }
}
