use std::future::Future;
use tokio::task::JoinSet;
use tracing::{error, trace};
use crate::core::error::{Error, Result};

/// Fan-out/fan-in over independent I/O tasks.
///
/// Every task is spawned as soon as the batch is built and runs to completion
/// on its own. Outcomes can be consumed in arrival order with [`FanOut::next`]
/// or reassembled by input position with [`FanOut::join`].
///
/// Dropping an unfinished batch detaches its tasks instead of aborting them, so
/// a caller that stops at the first failure leaves the sibling writes running.
pub struct FanOut<T: Send + 'static> {
    tasks: JoinSet<(usize, Result<T>)>,
    len: usize,
}

impl<T: Send + 'static> FanOut<T> {
    pub fn spawn<I, F>(tasks: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let mut set = JoinSet::new();
        let mut len = 0;
        for (index, task) in tasks.into_iter().enumerate() {
            set.spawn(async move { (index, task.await) });
            len += 1;
        }
        trace!(tasks = len, "fan-out started");
        FanOut { tasks: set, len }
    }

    /// Number of tasks in the batch
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Next finished task as `(input index, value)`, in completion order.
    ///
    /// `None` once every task has been reported.
    pub async fn next(&mut self) -> Option<Result<(usize, T)>> {
        let joined = self.tasks.join_next().await?;
        Some(match joined {
            Ok((index, Ok(value))) => Ok((index, value)),
            Ok((_, Err(e))) => Err(e),
            Err(e) => Err(task_failure(e)),
        })
    }

    /// Ordered values, or the first failure observed.
    ///
    /// Returns as soon as any task fails; the tasks still in flight are left
    /// running in the background and their outcomes are discarded.
    pub async fn try_join(mut self) -> Result<Vec<T>> {
        let mut slots: Vec<Option<T>> = (0..self.len).map(|_| None).collect();
        while let Some(done) = self.next().await {
            let (index, value) = done?;
            slots[index] = Some(value);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    /// Waits for every task; slot `i` holds the outcome of input task `i`.
    pub async fn join(mut self) -> Vec<Result<T>> {
        let mut slots: Vec<Option<Result<T>>> = (0..self.len).map(|_| None).collect();
        let mut lost = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => lost.push(task_failure(e)),
            }
        }

        // A panicked task never reports its index; it owns one of the empty slots.
        let mut lost = lost.into_iter();
        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(lost.next().unwrap_or_else(|| Error::internal("fan-out task vanished")))
                })
            })
            .collect()
    }

    /// Calls `handler` once, after all tasks have finished, with the ordered outcomes.
    pub fn on_complete<H>(self, handler: H)
    where
        H: FnOnce(Vec<Result<T>>) + Send + 'static,
    {
        tokio::spawn(async move {
            handler(self.join().await);
        });
    }
}

impl<T: Send + 'static> Drop for FanOut<T> {
    fn drop(&mut self) {
        self.tasks.detach_all();
    }
}

fn task_failure(err: tokio::task::JoinError) -> Error {
    error!(error = %err, "fan-out task did not complete");
    Error::internal(format!("fan-out task failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use crate::core::error::ErrorKind;

    async fn delayed(value: usize, delay_ms: u64) -> Result<usize> {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(value)
    }

    #[tokio::test]
    async fn test_join_is_ordered_by_input_not_arrival() {
        let batch = FanOut::spawn(vec![
            Box::pin(delayed(0, 30)),
            Box::pin(delayed(1, 1)),
            Box::pin(delayed(2, 15)),
        ]);
        assert_eq!(batch.len(), 3);

        let values: Vec<usize> = batch.join().await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_empty_batch_completes_immediately() {
        let batch = FanOut::<()>::spawn(Vec::<std::future::Ready<Result<()>>>::new());
        assert!(batch.is_empty());
        assert!(batch.join().await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let finished = Arc::new(AtomicUsize::new(0));
        let tasks = (0..4).map(|i| {
            let finished = finished.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5 * i as u64)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                if i == 1 {
                    return Err(Error::internal("task 1 failed"));
                }
                Ok(i)
            }
        });

        let outcomes = FanOut::spawn(tasks).join().await;
        assert_eq!(finished.load(Ordering::SeqCst), 4);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());
        assert_eq!(*outcomes[3].as_ref().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_next_reports_in_completion_order() {
        let mut batch = FanOut::spawn(vec![Box::pin(delayed(0, 20)), Box::pin(delayed(1, 0))]);
        assert_eq!(batch.next().await.unwrap().unwrap(), (1, 1));
        assert_eq!(batch.next().await.unwrap().unwrap(), (0, 0));
        assert!(batch.next().await.is_none());
    }

    #[tokio::test]
    async fn test_try_join_returns_first_failure_early() {
        let (tx, rx) = oneshot::channel();
        let slow = async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let _ = tx.send(());
            Ok::<i32, Error>(0)
        };
        let failing = async { Err::<i32, Error>(Error::internal("fast failure")) };
        let tasks: Vec<std::pin::Pin<Box<dyn Future<Output = Result<i32>> + Send>>> =
            vec![Box::pin(slow), Box::pin(failing)];

        let err = FanOut::spawn(tasks).try_join().await.unwrap_err();
        assert_eq!(err.context, "fast failure");
        // The slow sibling still finishes after the batch settled.
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_try_join_orders_values() {
        let values = FanOut::spawn((0..4).map(|i| delayed(i, (4 - i) as u64 * 3)))
            .try_join()
            .await
            .unwrap();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_dropped_batch_keeps_running() {
        let (tx, rx) = oneshot::channel();
        let batch = FanOut::spawn(vec![async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(());
            Ok::<_, Error>(())
        }]);
        drop(batch);
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_panicking_task_fills_its_slot_with_error() {
        let tasks = (0..3).map(|i| async move {
            if i == 2 {
                panic!("task 2 panicked");
            }
            Ok::<_, Error>(i)
        });
        let outcomes = FanOut::spawn(tasks).join().await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[2].as_ref().unwrap_err().kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_on_complete_fires_once_with_all_outcomes() {
        let (tx, rx) = oneshot::channel();
        FanOut::spawn((0..5).map(|i| delayed(i, (5 - i) as u64))).on_complete(move |outcomes| {
            let _ = tx.send(outcomes.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>());
        });
        assert_eq!(rx.await.unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
