//! FFmpeg-backed media helpers for the TTM worker.
//!
//! This crate provides:
//! - An FFmpeg image-sequence command and a runner with a deadline
//! - The `FrameEncoder` seam used to turn frame sequences into videos
//! - JPEG thumbnail writing

pub mod command;
pub mod encoder;
pub mod error;
pub mod thumbnail;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use encoder::{EncoderSettings, FfmpegEncoder, FrameEncoder};
pub use error::{MediaError, MediaResult};
pub use thumbnail::write_thumbnail;
