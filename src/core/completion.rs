use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use crate::core::error::{Error, Result};

/// Settle-once handle for an operation outcome.
///
/// Clones share one slot: the first `settle` delivers its outcome, every later
/// call is ignored and returns `false`. Dropping every clone unsettled resolves
/// the paired [`Deferred`] with an `Internal` error.
pub struct Settle<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<Result<T>>>>>,
}

impl<T> Clone for Settle<T> {
    fn clone(&self) -> Self {
        Settle { slot: self.slot.clone() }
    }
}

impl<T> Settle<T> {
    pub fn settle(&self, outcome: Result<T>) -> bool {
        let sender = self.slot.lock().take();
        match sender {
            // A dropped receiver still counts as settled
            Some(sender) => {
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }
}

/// Single-resolution deferred outcome of an operation.
///
/// Await it directly, or hand it a callback with [`Deferred::on_settle`].
pub struct Deferred<T> {
    receiver: oneshot::Receiver<Result<T>>,
    runtime: Handle,
}

/// Creates a connected settle handle and deferred value.
pub fn deferred<T>(runtime: Handle) -> (Settle<T>, Deferred<T>) {
    let (sender, receiver) = oneshot::channel();
    let settle = Settle { slot: Arc::new(Mutex::new(Some(sender))) };
    (settle, Deferred { receiver, runtime })
}

/// Runs `operation` on `runtime` right away and returns its deferred outcome.
///
/// The operation runs to completion even if the returned value is dropped.
pub fn spawn<T, F>(runtime: &Handle, operation: F) -> Deferred<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let (settle, deferred) = deferred(runtime.clone());
    runtime.spawn(async move {
        settle.settle(operation.await);
    });
    deferred
}

impl<T: Send + 'static> Deferred<T> {
    /// An already-settled value, for failures detected before any I/O.
    pub fn settled(runtime: Handle, outcome: Result<T>) -> Self {
        let (settle, deferred) = deferred(runtime);
        settle.settle(outcome);
        deferred
    }

    /// Callback mode: `callback` runs exactly once with the outcome.
    pub fn on_settle<F>(self, callback: F)
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let runtime = self.runtime.clone();
        runtime.spawn(async move {
            callback(self.await);
        });
    }

    /// With a callback the outcome goes there and nothing is returned;
    /// without one the caller gets the deferred value back.
    pub fn with_callback<F>(self, callback: Option<F>) -> Option<Self>
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        match callback {
            Some(callback) => {
                self.on_settle(callback);
                None
            }
            None => Some(self),
        }
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::internal(
                "operation was abandoned before it settled",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}
