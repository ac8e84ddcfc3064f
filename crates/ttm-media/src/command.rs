//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Lines of stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg invocation that turns a numbered image sequence into a video.
///
/// Arguments are laid out as `-y -v <level> <input args> -i <pattern>
/// <output args> <output>`.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    pattern: PathBuf,
    output: PathBuf,
    input_args: Vec<String>,
    output_args: Vec<String>,
    log_level: &'static str,
}

impl FfmpegCommand {
    /// Read `pattern` (e.g. `frame_%05d.png`) as a sequence played at `fps`.
    pub fn image_sequence(pattern: impl AsRef<Path>, fps: u32, output: impl AsRef<Path>) -> Self {
        Self {
            pattern: pattern.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: vec!["-framerate".to_string(), fps.to_string()],
            output_args: Vec::new(),
            log_level: "error",
        }
    }

    fn push_output(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.output_args.push(flag.to_string());
        self.output_args.push(value.into());
        self
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.push_output("-vf", filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.push_output("-c:v", codec)
    }

    /// Constant rate factor; lower is higher quality.
    pub fn crf(self, crf: u8) -> Self {
        self.push_output("-crf", crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.push_output("-preset", preset)
    }

    pub fn pixel_format(self, pix_fmt: impl Into<String>) -> Self {
        self.push_output("-pix_fmt", pix_fmt)
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), self.log_level.to_string()];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.pattern.to_string_lossy().into_owned());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Runs FFmpeg to completion, optionally under a deadline.
///
/// The child is killed when the returned future is dropped, so callers
/// cancel an encode by abandoning it.
#[derive(Debug, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let ffmpeg = check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        let stderr_tail = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            while let Ok(Some(line)) = lines.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join("\n")
        });

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("FFmpeg timed out after {:?}, killing process", limit);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill FFmpeg: {}", e);
                    }
                    return Err(MediaError::Timeout(limit.as_secs()));
                }
            },
            None => child.wait().await?,
        };

        let stderr = stderr_tail.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr.is_empty()).then_some(stderr),
                status.code(),
            ))
        }
    }
}

/// Locate the FFmpeg binary.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_sequence_args() {
        let cmd = FfmpegCommand::image_sequence("frames/frame_%05d.png", 16, "out.mp4")
            .video_codec("libx264")
            .pixel_format("yuv420p")
            .crf(18);

        let args = cmd.build_args();
        assert_eq!(&args[..3], ["-y", "-v", "error"]);

        let framerate = args.iter().position(|a| a == "-framerate").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(framerate < input);
        assert_eq!(args[framerate + 1], "16");
        assert_eq!(args[input + 1], "frames/frame_%05d.png");

        let codec = args.iter().position(|a| a == "-c:v").unwrap();
        assert!(codec > input);
        assert_eq!(args[codec + 1], "libx264");
        assert!(args.contains(&"yuv420p".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_output_args_keep_order() {
        let args = FfmpegCommand::image_sequence("a_%d.png", 8, "b.mp4")
            .video_filter("scale=64:64")
            .preset("fast")
            .build_args();

        let vf = args.iter().position(|a| a == "-vf").unwrap();
        let preset = args.iter().position(|a| a == "-preset").unwrap();
        assert!(vf < preset);
        assert_eq!(args[vf + 1], "scale=64:64");
    }
}
