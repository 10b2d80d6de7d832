use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("task queue is shut down")]
    Closed,

    #[error("queued job panicked")]
    JobFailed,
}

/// Process-local FIFO executor.
///
/// One worker runs jobs strictly in arrival order, each to completion before
/// the next starts, with an optional pause in between. Each job runs in its own
/// task so a panic fails only that job. Nothing is persisted: jobs not started
/// before shutdown are dropped.
pub struct SerialQueue {
    sender: mpsc::UnboundedSender<Job>,
    cancel: CancellationToken,
}

impl SerialQueue {
    pub fn new(interval: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tokio::spawn(run_worker(receiver, cancel.clone(), interval));

        Self { sender, cancel }
    }

    /// Append `job` and wait for its result
    pub async fn enqueue<F, T>(&self, job: F) -> Result<T, QueueError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(QueueError::Closed);
        }

        let (result_tx, result_rx) = oneshot::channel();
        let wrapped: Job = Box::pin(async move {
            let _ = result_tx.send(job.await);
        });

        self.sender.send(wrapped).map_err(|_| QueueError::Closed)?;

        result_rx.await.map_err(|_| {
            if self.cancel.is_cancelled() {
                QueueError::Closed
            } else {
                QueueError::JobFailed
            }
        })
    }

    /// Stop after the running job; queued jobs resolve to `Closed`
    pub fn shutdown(&self) {
        debug!("Shutting down task queue");
        self.cancel.cancel();
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<Job>,
    cancel: CancellationToken,
    interval: Duration,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = receiver.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        if let Err(e) = tokio::spawn(job).await {
            error!("Queued job failed: {}", e);
        }

        if !interval.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    debug!("Task queue worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_jobs_run_in_order_one_at_a_time() {
        let queue = SerialQueue::new(Duration::ZERO);
        let order = Arc::new(Mutex::new(Vec::new()));
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let job = |id: usize, delay_ms: u64| {
            let order = order.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                order.lock().unwrap().push(id);
                active.fetch_sub(1, Ordering::SeqCst);
                id
            }
        };

        let (a, b, c) = tokio::join!(
            queue.enqueue(job(1, 30)),
            queue.enqueue(job(2, 1)),
            queue.enqueue(job(3, 10)),
        );

        assert_eq!((a, b, c), (Ok(1), Ok(2), Ok(3)));
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_job_errors_pass_through() {
        let queue = SerialQueue::new(Duration::ZERO);
        let result: Result<Result<u8, String>, QueueError> =
            queue.enqueue(async { Err("boom".to_string()) }).await;
        assert_eq!(result, Ok(Err("boom".to_string())));
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_worker() {
        let queue = SerialQueue::new(Duration::ZERO);

        let failed = queue
            .enqueue(async {
                panic!("job exploded");
            })
            .await;
        assert_eq!(failed, Err::<(), _>(QueueError::JobFailed));

        assert_eq!(queue.enqueue(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_interval_spaces_jobs() {
        let queue = SerialQueue::new(Duration::from_millis(25));
        let started = tokio::time::Instant::now();

        let (a, b) = tokio::join!(queue.enqueue(async { 1 }), queue.enqueue(async { 2 }));
        assert_eq!((a, b), (Ok(1), Ok(2)));
        assert!(started.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn test_shutdown_drops_pending_jobs() {
        let queue = Arc::new(SerialQueue::new(Duration::ZERO));

        let running = tokio::spawn({
            let queue = queue.clone();
            async move {
                queue
                    .enqueue(async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        "first"
                    })
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let pending = tokio::spawn({
            let queue = queue.clone();
            async move { queue.enqueue(async { "second" }).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        queue.shutdown();

        assert_eq!(running.await.unwrap(), Ok("first"));
        assert_eq!(pending.await.unwrap(), Err(QueueError::Closed));
        assert_eq!(queue.enqueue(async { "late" }).await, Err(QueueError::Closed));
    }
}
