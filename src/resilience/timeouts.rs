//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the wait for a backend response (admission, connect, headers)
//! - Bound the pause between body chunks once streaming has started
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - A stalled stream ends after yielding one error; it is never resumed

use std::future::Future;
use std::time::Duration;

use futures_util::stream::{self, Stream, StreamExt};
use thiserror::Error;

/// The deadline passed before the wrapped future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} exceeded")]
pub struct DeadlineExceeded(pub Duration);

/// A stream produced nothing for longer than the idle bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no data received for {0:?}")]
pub struct Stalled(pub Duration);

/// Run `fut` to completion or fail once `deadline` has elapsed.
///
/// Dropping the inner future on expiry cancels whatever it was awaiting.
pub async fn with_deadline<F: Future>(
    deadline: Duration,
    fut: F,
) -> Result<F::Output, DeadlineExceeded> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}

/// Wrap a fallible stream so that a gap longer than `idle` between two items
/// yields a [`Stalled`] error and terminates the stream.
///
/// An inner error is forwarded once and also terminates the stream.
pub fn idle_timeout<S, T, E>(inner: S, idle: Duration) -> impl Stream<Item = Result<T, E>> + Send
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<Stalled> + Send + 'static,
{
    stream::unfold(Some(Box::pin(inner)), move |state| async move {
        let mut inner = state?;
        match tokio::time::timeout(idle, inner.next()).await {
            Ok(Some(Ok(item))) => Some((Ok(item), Some(inner))),
            Ok(Some(Err(e))) => Some((Err(e), None)),
            Ok(None) => None,
            Err(_) => Some((Err(Stalled(idle).into()), None)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Stalled,
        Broken,
    }

    impl From<Stalled> for TestError {
        fn from(_: Stalled) -> Self {
            TestError::Stalled
        }
    }

    #[tokio::test]
    async fn deadline_passes_fast_futures() {
        let out = with_deadline(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expires() {
        let out = with_deadline(Duration::from_millis(50), tokio::time::sleep(Duration::from_secs(10))).await;
        assert_eq!(out, Err(DeadlineExceeded(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn idle_timeout_passes_items_through() {
        let inner = stream::iter(vec![Ok::<_, TestError>(1), Ok(2), Ok(3)]);
        let items: Vec<_> = idle_timeout(inner, Duration::from_secs(1)).collect().await;
        assert_eq!(items, vec![Ok(1), Ok(2), Ok(3)]);
    }

    #[tokio::test]
    async fn idle_timeout_stops_after_inner_error() {
        let inner = stream::iter(vec![Ok(1), Err(TestError::Broken), Ok(3)]);
        let items: Vec<_> = idle_timeout(inner, Duration::from_secs(1)).collect().await;
        assert_eq!(items, vec![Ok(1), Err(TestError::Broken)]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_ends_stalled_stream() {
        let inner = stream::iter(vec![Ok::<_, TestError>(1)]).chain(stream::pending());
        let items: Vec<_> = idle_timeout(inner, Duration::from_millis(100)).collect().await;
        assert_eq!(items, vec![Ok(1), Err(TestError::Stalled)]);
    }
}
