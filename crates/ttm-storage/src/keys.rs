//! Object key layout.

use ttm_models::JobId;

use crate::error::{StorageError, StorageResult};

/// Folder holding a project's generated clips.
pub fn project_folder(project_id: &str) -> StorageResult<String> {
    validate_segment(project_id)?;
    Ok(format!("projects/{}/ttm", project_id))
}

/// `projects/{project_id}/ttm/{job_id}.mp4`
pub fn video_key(project_id: &str, job_id: &JobId) -> StorageResult<String> {
    Ok(format!("{}/{}.mp4", project_folder(project_id)?, job_id))
}

/// `projects/{project_id}/ttm/{job_id}_thumb.jpg`
pub fn thumbnail_key(project_id: &str, job_id: &JobId) -> StorageResult<String> {
    Ok(format!("{}/{}_thumb.jpg", project_folder(project_id)?, job_id))
}

/// Reject segments that would escape the project folder.
fn validate_segment(segment: &str) -> StorageResult<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(StorageError::invalid_key(format!(
            "invalid project id: {:?}",
            segment
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_keys() {
        let job_id = JobId::from_string("abc");
        assert_eq!(video_key("p1", &job_id).unwrap(), "projects/p1/ttm/abc.mp4");
        assert_eq!(
            thumbnail_key("p1", &job_id).unwrap(),
            "projects/p1/ttm/abc_thumb.jpg"
        );
    }

    #[test]
    fn test_rejects_traversal() {
        let job_id = JobId::from_string("abc");
        assert!(video_key("..", &job_id).is_err());
        assert!(video_key("a/b", &job_id).is_err());
        assert!(video_key("", &job_id).is_err());
    }
}
