//! Per-job scratch directories and output paths.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use ttm_models::JobId;

use crate::error::WorkerResult;

/// Scratch directory `{root}/{job_id}` that is removed when the run ends.
///
/// Call [`JobWorkspace::cleanup`] on every path out of a run. If the guard
/// is dropped without it (the run future was aborted), the directory is
/// removed synchronously in `Drop`.
#[derive(Debug)]
pub struct JobWorkspace {
    path: PathBuf,
    cleaned: bool,
}

impl JobWorkspace {
    /// Create (or reuse) the workspace for `job_id`.
    pub async fn create(root: &Path, job_id: &JobId) -> WorkerResult<Self> {
        let path = workspace_path(root, job_id);
        tokio::fs::create_dir_all(&path).await?;
        debug!(path = %path.display(), "Created job workspace");
        Ok(Self {
            path,
            cleaned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the cue video is written.
    pub fn motion_signal_path(&self) -> PathBuf {
        self.path.join("motion_signal.mp4")
    }

    /// Where the mask video is written.
    pub fn mask_path(&self) -> PathBuf {
        self.path.join("mask.mp4")
    }

    /// Remove the directory and everything in it.
    pub async fn cleanup(mut self) {
        self.cleaned = true;
        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "Failed to remove job workspace: {}", e);
            }
        }
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if !self.cleaned {
            warn!(
                path = %self.path.display(),
                "Job workspace dropped without cleanup, removing it now"
            );
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

pub fn workspace_path(root: &Path, job_id: &JobId) -> PathBuf {
    root.join(job_id.as_str())
}

/// Final artifacts of a job inside the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub video: PathBuf,
    pub thumbnail: PathBuf,
}

impl ArtifactPaths {
    /// `{output_dir}/{job_id}.mp4` and `{output_dir}/{job_id}_thumb.jpg`.
    pub fn new(output_dir: &Path, job_id: &JobId) -> Self {
        Self {
            video: output_dir.join(format!("{}.mp4", job_id)),
            thumbnail: output_dir.join(format!("{}_thumb.jpg", job_id)),
        }
    }

    /// Delete both files, ignoring ones that do not exist.
    pub async fn remove(&self) {
        for path in [&self.video, &self.thumbnail] {
            remove_file_quietly(path).await;
        }
    }
}

async fn remove_file_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "Failed to remove artifact: {}", e),
    }
}

/// Remove a workspace directory that may still exist after a delete.
pub async fn remove_workspace(root: &Path, job_id: &JobId) {
    let path = workspace_path(root, job_id);
    match tokio::fs::remove_dir_all(&path).await {
        Ok(()) => debug!(path = %path.display(), "Removed job workspace"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "Failed to remove job workspace: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_workspace_cleanup() {
        let root = tempfile::tempdir().unwrap();
        let job_id = JobId::from_string("job-1");

        let ws = JobWorkspace::create(root.path(), &job_id).await.unwrap();
        assert_eq!(ws.path(), root.path().join("job-1"));
        assert_eq!(ws.mask_path(), root.path().join("job-1").join("mask.mp4"));
        tokio::fs::write(ws.motion_signal_path(), b"x").await.unwrap();

        ws.cleanup().await;
        assert!(!root.path().join("job-1").exists());
    }

    #[tokio::test]
    async fn test_workspace_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let job_id = JobId::from_string("job-2");

        {
            let ws = JobWorkspace::create(root.path(), &job_id).await.unwrap();
            tokio::fs::write(ws.mask_path(), b"x").await.unwrap();
        }
        assert!(!root.path().join("job-2").exists());
    }

    #[tokio::test]
    async fn test_artifact_paths() {
        let dir = tempfile::tempdir().unwrap();
        let job_id = JobId::from_string("abc");
        let paths = ArtifactPaths::new(dir.path(), &job_id);

        assert_eq!(paths.video, dir.path().join("abc.mp4"));
        assert_eq!(paths.thumbnail, dir.path().join("abc_thumb.jpg"));

        tokio::fs::write(&paths.video, b"v").await.unwrap();
        paths.remove().await;
        assert!(!paths.video.exists());
        assert!(!paths.thumbnail.exists());
    }
}
