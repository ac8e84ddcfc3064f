//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn, Instrument};
use ttm_models::GenerationResult;
use ttm_queue::JobReceiver;

use crate::cancel::{never_cancelled, CancelRegistry};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::orchestrator::{GenerationOrchestrator, GENERATION_OPERATION};
use crate::task::GenerationTask;

const SHUTDOWN_MESSAGE: &str = "Service is shutting down";

/// Job executor that drains the task queue into the orchestrator.
pub struct JobExecutor {
    config: WorkerConfig,
    orchestrator: Arc<GenerationOrchestrator>,
    cancels: CancelRegistry,
    receiver: Mutex<JobReceiver<GenerationTask>>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        config: WorkerConfig,
        orchestrator: Arc<GenerationOrchestrator>,
        cancels: CancelRegistry,
        receiver: JobReceiver<GenerationTask>,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let (shutdown, _) = tokio::sync::watch::channel(false);

        Self {
            config,
            orchestrator,
            cancels,
            receiver: Mutex::new(receiver),
            job_semaphore,
            shutdown,
        }
    }

    /// Start the executor. Returns after shutdown once in-flight jobs have
    /// finished or the shutdown timeout elapsed.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.config.max_concurrent_jobs
        );

        let mut receiver = self.receiver.lock().await;
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow_and_update() {
                info!("Shutdown signal received, stopping executor");
                break;
            }

            // Take a slot first so tasks stay queued (and pending) while
            // every worker is busy.
            let permit = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                permit = self.job_semaphore.clone().acquire_owned() => permit
                    .map_err(|_| WorkerError::job_failed("Semaphore closed"))?,
            };

            let task = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                task = receiver.recv() => task,
            };

            match task {
                Some(task) => self.spawn_job(task, permit),
                None => {
                    info!("Job queue closed, stopping executor");
                    break;
                }
            }
        }

        receiver.close();
        let mut abandoned = 0usize;
        while let Some(task) = receiver.try_recv() {
            self.abandon(task).await;
            abandoned += 1;
        }
        if abandoned > 0 {
            warn!("Failed {} queued jobs on shutdown", abandoned);
        }

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "In-flight jobs still running after {:?}",
                self.config.shutdown_timeout
            );
        }

        info!("Job executor stopped");
        Ok(())
    }

    fn spawn_job(&self, task: GenerationTask, permit: OwnedSemaphorePermit) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let cancels = self.cancels.clone();
        let cancel_rx = cancels
            .receiver(&task.job_id)
            .unwrap_or_else(never_cancelled);
        let span = JobLogger::new(&task.job_id, GENERATION_OPERATION).create_span();

        tokio::spawn(
            async move {
                let _permit = permit;
                let job_id = task.job_id.clone();
                info!("Executing job {}", job_id);

                match orchestrator.run(task, cancel_rx).await {
                    Ok(result) => debug!("Job {} recorded as {}", job_id, result.status),
                    Err(e) if e.is_job_gone() => debug!("Job {} was deleted", job_id),
                    Err(e) => warn!("Job {} not recorded: {}", job_id, e),
                }
                cancels.remove(&job_id);
            }
            .instrument(span),
        );
    }

    /// Fail a task that never reached a worker.
    async fn abandon(&self, task: GenerationTask) {
        let job_id = task.job_id;
        if let Err(e) = self
            .orchestrator
            .store()
            .finish(&job_id, GenerationResult::failed(SHUTDOWN_MESSAGE))
            .await
        {
            debug!("Queued job {} not failed on shutdown: {}", job_id, e);
        }
        self.cancels.remove(&job_id);
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            let available = self.job_semaphore.available_permits();
            if available == self.config.max_concurrent_jobs.max(1) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Jobs currently running.
    pub fn in_flight(&self) -> usize {
        self.config.max_concurrent_jobs.max(1) - self.job_semaphore.available_permits()
    }
}
