//! Frame-sequence encoding.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Pad odd dimensions to even ones; libx264 with yuv420p rejects odd sizes.
const EVEN_PAD_FILTER: &str = "pad=ceil(iw/2)*2:ceil(ih/2)*2";

/// Image-sequence pattern written into the staging directory.
const FRAME_PATTERN: &str = "frame_%05d.png";

/// Encodes in-memory frames into a video file.
#[async_trait]
pub trait FrameEncoder: Send + Sync {
    /// Encode `frames` at `fps` into `output`, replacing any existing file.
    async fn encode(&self, frames: Vec<DynamicImage>, fps: u32, output: &Path) -> MediaResult<()>;
}

/// H.264 encoder settings.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub codec: String,
    pub preset: String,
    pub crf: u8,
    pub pixel_format: String,
    /// Per-encode FFmpeg deadline
    pub timeout: Option<Duration>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 18,
            pixel_format: "yuv420p".to_string(),
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Encoder that stages PNG frames on disk and runs FFmpeg over them.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    settings: EncoderSettings,
}

impl FfmpegEncoder {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    fn command(&self, pattern: &Path, fps: u32, output: &Path) -> FfmpegCommand {
        FfmpegCommand::image_sequence(pattern, fps, output)
            .video_filter(EVEN_PAD_FILTER)
            .video_codec(&self.settings.codec)
            .preset(&self.settings.preset)
            .crf(self.settings.crf)
            .pixel_format(&self.settings.pixel_format)
    }
}

#[async_trait]
impl FrameEncoder for FfmpegEncoder {
    async fn encode(&self, frames: Vec<DynamicImage>, fps: u32, output: &Path) -> MediaResult<()> {
        check_frames(&frames)?;

        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent).await?;

        let staging = tempfile::Builder::new()
            .prefix(".frames-")
            .tempdir_in(parent)?;
        let staging_path = staging.path().to_path_buf();
        let frame_count = frames.len();

        tokio::task::spawn_blocking(move || write_frames(&frames, &staging_path))
            .await
            .map_err(|e| MediaError::internal(format!("frame writer panicked: {}", e)))??;

        let cmd = self.command(&staging.path().join(FRAME_PATTERN), fps, output);
        let mut runner = FfmpegRunner::new();
        if let Some(limit) = self.settings.timeout {
            runner = runner.with_timeout(limit);
        }
        runner.run(&cmd).await?;

        debug!(
            output = %output.display(),
            frames = frame_count,
            fps = fps,
            "Encoded frame sequence"
        );

        Ok(())
    }
}

/// All frames must exist and share one size.
pub fn check_frames(frames: &[DynamicImage]) -> MediaResult<()> {
    let first = frames.first().ok_or(MediaError::NoFrames)?;
    let expected = (first.width(), first.height());

    for (index, frame) in frames.iter().enumerate() {
        let actual = (frame.width(), frame.height());
        if actual != expected {
            return Err(MediaError::FrameSizeMismatch {
                index,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

fn write_frames(frames: &[DynamicImage], dir: &Path) -> MediaResult<()> {
    for (i, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("frame_{:05}.png", i));
        frame.save_with_format(&path, image::ImageFormat::Png)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    #[test]
    fn test_check_frames() {
        assert!(matches!(check_frames(&[]), Err(MediaError::NoFrames)));

        let frames = vec![
            DynamicImage::ImageRgb8(RgbImage::new(4, 4)),
            DynamicImage::ImageLuma8(GrayImage::new(4, 4)),
        ];
        assert!(check_frames(&frames).is_ok());

        let mismatched = vec![
            DynamicImage::ImageRgb8(RgbImage::new(4, 4)),
            DynamicImage::ImageRgb8(RgbImage::new(4, 6)),
        ];
        assert!(matches!(
            check_frames(&mismatched),
            Err(MediaError::FrameSizeMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_write_frames_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![DynamicImage::ImageRgb8(RgbImage::new(2, 2)); 3];
        write_frames(&frames, dir.path()).unwrap();

        assert!(dir.path().join("frame_00000.png").exists());
        assert!(dir.path().join("frame_00002.png").exists());
        assert!(!dir.path().join("frame_00003.png").exists());
    }

    #[test]
    fn test_command_uses_settings() {
        let encoder = FfmpegEncoder::default();
        let args = encoder
            .command(Path::new("/tmp/x/frame_%05d.png"), 16, Path::new("/tmp/out.mp4"))
            .build_args();
        assert!(args.contains(&EVEN_PAD_FILTER.to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"16".to_string()));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg in PATH"]
    async fn test_encode_with_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip.mp4");
        let frames = vec![DynamicImage::ImageRgb8(RgbImage::new(33, 21)); 8];

        FfmpegEncoder::default().encode(frames, 16, &output).await.unwrap();
        assert!(output.metadata().unwrap().len() > 0);
    }
}
