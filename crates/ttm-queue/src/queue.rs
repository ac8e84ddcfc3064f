//! Bounded task queue between request intake and the worker pool.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::error::{QueueError, QueueResult};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of tasks waiting for a worker
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 16 }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            capacity: std::env::var("TTM_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|c: &usize| *c > 0)
                .unwrap_or(16),
        }
    }
}

/// Producer side of the task queue. Cheap to clone.
#[derive(Debug)]
pub struct JobQueue<T> {
    tx: mpsc::Sender<T>,
    capacity: usize,
}

impl<T> Clone for JobQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
        }
    }
}

/// Consumer side of the task queue.
#[derive(Debug)]
pub struct JobReceiver<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> JobQueue<T> {
    /// Create a queue and its single consumer.
    pub fn new(config: &QueueConfig) -> (Self, JobReceiver<T>) {
        let capacity = config.capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, capacity }, JobReceiver { rx })
    }

    /// Enqueue without waiting; a full queue is reported as `QueueFull`.
    pub fn enqueue(&self, task: T) -> QueueResult<()> {
        match self.tx.try_send(task) {
            Ok(()) => {
                debug!(depth = self.depth(), "Task enqueued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(QueueError::QueueFull(self.capacity)),
            Err(TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Tasks currently waiting.
    pub fn depth(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> JobReceiver<T> {
    /// Next task, or `None` once every producer is gone and the queue drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take a task if one is immediately available.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting new tasks; queued ones can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
