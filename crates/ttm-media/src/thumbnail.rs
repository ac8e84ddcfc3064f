//! Thumbnail generation.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::{MediaError, MediaResult};

/// Write `frame` as a JPEG thumbnail.
pub async fn write_thumbnail(frame: &RgbImage, output_path: impl AsRef<Path>) -> MediaResult<()> {
    let frame = frame.clone();
    let output_path: PathBuf = output_path.as_ref().to_path_buf();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::task::spawn_blocking(move || {
        frame.save_with_format(&output_path, image::ImageFormat::Jpeg)
    })
    .await
    .map_err(|e| MediaError::internal(format!("thumbnail writer panicked: {}", e)))??;

    Ok(())
}
