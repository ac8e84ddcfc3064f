//! In-memory job table.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use ttm_models::{GenerationResult, Job, JobId, JobStatus};

use crate::error::{QueueError, QueueResult};

/// Job counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }

    pub fn active(&self) -> usize {
        self.pending + self.processing
    }
}

/// Table of jobs keyed by id.
///
/// Cheap to clone; all clones share the same table. Every mutation happens
/// under the write lock, so readers always see a consistent snapshot and
/// progress never moves backwards.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh pending job and return its id.
    pub async fn create(&self) -> JobId {
        let mut jobs = self.jobs.write().await;
        let mut job_id = JobId::new();
        while jobs.contains_key(&job_id) {
            job_id = JobId::new();
        }
        jobs.insert(job_id.clone(), Job::new(job_id.clone()));
        debug!(job_id = %job_id, "Job created");
        job_id
    }

    /// Move a job to `status`.
    pub async fn set_status(&self, job_id: &JobId, status: JobStatus) -> QueueResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = live_job(&mut jobs, job_id)?;
        check_transition(job, status)?;
        job.status = status;
        job.touch();
        Ok(())
    }

    /// Record progress in [0, 1]; values may only grow.
    pub async fn set_progress(&self, job_id: &JobId, progress: f64) -> QueueResult<()> {
        if !progress.is_finite() || !(0.0..=1.0).contains(&progress) {
            return Err(QueueError::InvalidProgress(progress));
        }

        let mut jobs = self.jobs.write().await;
        let job = live_job(&mut jobs, job_id)?;
        if progress < job.progress {
            return Err(QueueError::ProgressRegression {
                current: job.progress,
                requested: progress,
            });
        }
        job.progress = progress;
        job.touch();
        Ok(())
    }

    /// Attach a result to a job that is still running.
    pub async fn set_result(&self, job_id: &JobId, result: GenerationResult) -> QueueResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = live_job(&mut jobs, job_id)?;
        job.result = Some(result);
        job.touch();
        Ok(())
    }

    /// Record the terminal status implied by `result` together with the
    /// result itself. Succeeds at most once per job.
    pub async fn finish(&self, job_id: &JobId, result: GenerationResult) -> QueueResult<Job> {
        let mut jobs = self.jobs.write().await;
        let job = live_job(&mut jobs, job_id)?;

        let status = result.status;
        if !status.is_terminal() {
            return Err(QueueError::InvalidTransition {
                job_id: job_id.clone(),
                from: job.status,
                to: status,
            });
        }
        check_transition(job, status)?;

        job.status = status;
        if status == JobStatus::Completed {
            job.progress = 1.0;
        }
        job.result = Some(result);
        job.touch();

        debug!(job_id = %job_id, status = %status, "Job finished");
        Ok(job.clone())
    }

    /// Snapshot of a job.
    pub async fn get(&self, job_id: &JobId) -> QueueResult<Job> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound(job_id.clone()))
    }

    /// Remove a job and hand back its last state.
    pub async fn delete(&self, job_id: &JobId) -> QueueResult<Job> {
        self.jobs
            .write()
            .await
            .remove(job_id)
            .ok_or_else(|| QueueError::NotFound(job_id.clone()))
    }

    pub async fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.read().await.contains_key(job_id)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Number of pending or processing jobs.
    pub async fn active_count(&self) -> usize {
        self.counts().await.active()
    }

    pub async fn counts(&self) -> JobCounts {
        let jobs = self.jobs.read().await;
        let mut counts = JobCounts::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

/// Look up a job that can still change.
fn live_job<'a>(jobs: &'a mut HashMap<JobId, Job>, job_id: &JobId) -> QueueResult<&'a mut Job> {
    let job = jobs
        .get_mut(job_id)
        .ok_or_else(|| QueueError::NotFound(job_id.clone()))?;
    if job.is_terminal() {
        return Err(QueueError::Terminal {
            job_id: job_id.clone(),
            status: job.status,
        });
    }
    Ok(job)
}

fn check_transition(job: &Job, to: JobStatus) -> QueueResult<()> {
    if !job.status.can_transition_to(to) {
        return Err(QueueError::InvalidTransition {
            job_id: job.job_id.clone(),
            from: job.status,
            to,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed() -> GenerationResult {
        GenerationResult::completed("/out/a.mp4", "/out/a_thumb.jpg", 81, 16, 1.0)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = JobStore::new();
        let id = store.create().await;

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0.0);
        assert!(job.result.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = JobStore::new();
        let id = JobId::from_string("missing");

        assert!(store.get(&id).await.unwrap_err().is_not_found());
        assert!(store.set_progress(&id, 0.5).await.unwrap_err().is_not_found());
        assert!(store.delete(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let store = JobStore::new();
        let id = store.create().await;

        store.set_status(&id, JobStatus::Processing).await.unwrap();
        store.set_progress(&id, 0.3).await.unwrap();
        let job = store.finish(&id, completed()).await.unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
        assert!(job.result.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let store = JobStore::new();
        let id = store.create().await;
        store.set_status(&id, JobStatus::Processing).await.unwrap();

        store.set_progress(&id, 0.5).await.unwrap();
        store.set_progress(&id, 0.5).await.unwrap();
        assert_eq!(
            store.set_progress(&id, 0.4).await,
            Err(QueueError::ProgressRegression {
                current: 0.5,
                requested: 0.4
            })
        );
        assert_eq!(store.get(&id).await.unwrap().progress, 0.5);
    }

    #[tokio::test]
    async fn test_progress_bounds() {
        let store = JobStore::new();
        let id = store.create().await;

        assert!(matches!(
            store.set_progress(&id, 1.5).await,
            Err(QueueError::InvalidProgress(_))
        ));
        assert!(matches!(
            store.set_progress(&id, -0.1).await,
            Err(QueueError::InvalidProgress(_))
        ));
        assert!(matches!(
            store.set_progress(&id, f64::NAN).await,
            Err(QueueError::InvalidProgress(_))
        ));
    }

    #[tokio::test]
    async fn test_set_result_keeps_status() {
        let store = JobStore::new();
        let id = store.create().await;
        store.set_status(&id, JobStatus::Processing).await.unwrap();

        store.set_result(&id, completed()).await.unwrap();

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.result.is_some());
        assert!(store
            .set_result(&JobId::from_string("missing"), completed())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_frozen() {
        let store = JobStore::new();
        let id = store.create().await;
        store.finish(&id, GenerationResult::failed("boom")).await.unwrap();

        assert!(matches!(
            store.set_status(&id, JobStatus::Processing).await,
            Err(QueueError::Terminal { .. })
        ));
        assert!(matches!(
            store.set_progress(&id, 0.9).await,
            Err(QueueError::Terminal { .. })
        ));
        assert!(matches!(
            store.finish(&id, completed()).await,
            Err(QueueError::Terminal { .. })
        ));

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.result.unwrap().error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_pending_cannot_complete() {
        let store = JobStore::new();
        let id = store.create().await;

        assert!(matches!(
            store.finish(&id, completed()).await,
            Err(QueueError::InvalidTransition { .. })
        ));
        assert!(matches!(
            store.set_status(&id, JobStatus::Completed).await,
            Err(QueueError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_progress_is_kept() {
        let store = JobStore::new();
        let id = store.create().await;
        store.set_status(&id, JobStatus::Processing).await.unwrap();
        store.set_progress(&id, 0.4).await.unwrap();

        let job = store.finish(&id, GenerationResult::failed("x")).await.unwrap();
        assert_eq!(job.progress, 0.4);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let store = JobStore::new();
        let id = store.create().await;

        let removed = store.delete(&id).await.unwrap();
        assert_eq!(removed.job_id, id);
        assert!(store.delete(&id).await.unwrap_err().is_not_found());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_counts() {
        let store = JobStore::new();
        let a = store.create().await;
        let b = store.create().await;
        let _c = store.create().await;

        store.set_status(&a, JobStatus::Processing).await.unwrap();
        store.finish(&b, GenerationResult::failed("x")).await.unwrap();

        let counts = store.counts().await;
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.total(), 3);
        assert_eq!(store.active_count().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_finish_happens_once() {
        let store = JobStore::new();
        let id = store.create().await;
        store.set_status(&id, JobStatus::Processing).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    let result = if i % 2 == 0 {
                        completed()
                    } else {
                        GenerationResult::failed("x")
                    };
                    store.finish(&id, result).await.is_ok()
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
