//! Single-assignment settlement cell.
//!
//! A [`Deferred`] hands exactly one result to the task awaiting the paired
//! [`Settlement`]. Resolving or rejecting a cell that has already been settled
//! is a no-op, so routing code can settle unconditionally without tracking
//! whether a competing path (a reply, a close, a link failure) got there
//! first.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::oneshot;

/// Error produced when a [`Deferred`] is dropped without being settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("settlement cell dropped before it was settled")]
pub struct Abandoned;

/// Write side of a settlement cell.
#[derive(Debug)]
pub struct Deferred<T, E> {
    tx: Option<oneshot::Sender<Result<T, E>>>,
}

/// Read side of a settlement cell.
///
/// Resolves to the value or error passed to the paired [`Deferred`], or to
/// `E::from(Abandoned)` if the cell is dropped unsettled.
#[derive(Debug)]
pub struct Settlement<T, E> {
    rx: oneshot::Receiver<Result<T, E>>,
}

/// Create a connected settlement cell.
///
/// # Examples
///
/// ```
/// use nighthouse::deferred::{Abandoned, deferred};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (mut cell, settlement) = deferred::<u32, Abandoned>();
/// assert!(cell.resolve(7));
/// assert!(!cell.reject(Abandoned));
/// assert_eq!(settlement.await, Ok(7));
/// # }
/// ```
#[must_use]
pub fn deferred<T, E>() -> (Deferred<T, E>, Settlement<T, E>) {
    let (tx, rx) = oneshot::channel();
    (Deferred { tx: Some(tx) }, Settlement { rx })
}

impl<T, E> Deferred<T, E> {
    /// Settle the cell with a value.
    ///
    /// Returns `false` if the cell had already been settled. A waiter that
    /// has gone away does not count as a failure; the value is dropped.
    pub fn resolve(&mut self, value: T) -> bool { self.settle(Ok(value)) }

    /// Settle the cell with an error.
    ///
    /// Returns `false` if the cell had already been settled.
    pub fn reject(&mut self, error: E) -> bool { self.settle(Err(error)) }

    /// Settle the cell with a ready-made result.
    pub fn settle(&mut self, result: Result<T, E>) -> bool {
        match self.tx.take() {
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Returns `true` once the cell has been resolved or rejected.
    #[must_use]
    pub fn is_settled(&self) -> bool { self.tx.is_none() }

    /// Returns `true` if nobody is waiting on the paired [`Settlement`].
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.tx.as_ref().is_none_or(oneshot::Sender::is_closed)
    }
}

impl<T, E> Future for Settlement<T, E>
where
    E: From<Abandoned>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(Abandoned))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_settlement_wins() {
        let (mut cell, settlement) = deferred::<&str, Abandoned>();
        assert!(!cell.is_settled());
        assert!(cell.reject(Abandoned));
        assert!(!cell.resolve("late"));
        assert!(cell.is_settled());
        assert_eq!(settlement.await, Err(Abandoned));
    }

    #[tokio::test]
    async fn dropped_cell_yields_abandoned() {
        let (cell, settlement) = deferred::<u8, Abandoned>();
        drop(cell);
        assert_eq!(settlement.await, Err(Abandoned));
    }

    #[test]
    fn settling_after_waiter_left_is_not_an_error() {
        let (mut cell, settlement) = deferred::<u8, Abandoned>();
        drop(settlement);
        assert!(cell.is_abandoned());
        assert!(cell.resolve(1));
        assert!(!cell.resolve(2));
    }

    #[tokio::test]
    async fn settlement_waits_for_value() {
        let (mut cell, settlement) = deferred::<u8, Abandoned>();
        let waiter = tokio::spawn(settlement);
        tokio::task::yield_now().await;
        cell.resolve(9);
        assert_eq!(waiter.await.expect("join waiter"), Ok(9));
    }
}
