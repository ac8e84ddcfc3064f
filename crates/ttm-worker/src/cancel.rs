//! Per-job cancellation signals.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use ttm_models::JobId;

/// Registry of cancellation channels, one per live job.
///
/// A channel is registered when a job is accepted and removed when the job
/// finishes or is deleted. Flipping it to `true` asks the run to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelRegistry {
    senders: Arc<Mutex<HashMap<JobId, watch::Sender<bool>>>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, watch::Sender<bool>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a job and return its receiver.
    pub fn register(&self, job_id: &JobId) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        self.lock().insert(job_id.clone(), tx);
        rx
    }

    /// Receiver for a registered job.
    pub fn receiver(&self, job_id: &JobId) -> Option<watch::Receiver<bool>> {
        self.lock().get(job_id).map(|tx| tx.subscribe())
    }

    /// Signal cancellation. Returns false when the job is not registered.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        match self.lock().get(job_id) {
            Some(tx) => {
                tx.send_replace(true);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, job_id: &JobId) {
        self.lock().remove(job_id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Receiver that never fires, for runs without a registered channel.
pub fn never_cancelled() -> watch::Receiver<bool> {
    let (_tx, rx) = watch::channel(false);
    rx
}

/// Resolve once `rx` reads `true`; pends forever if the sender goes away.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
