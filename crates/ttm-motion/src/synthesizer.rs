//! Motion signal synthesizer.

use image::{GrayImage, Luma, RgbImage};
use tracing::debug;
use ttm_models::{CameraMovement, MotionSpec, Point};

use crate::camera::{transform_at, warp};
use crate::error::{MotionError, MotionResult};
use crate::object::{render_frame, MASK_ON};
use crate::signal::MotionSignal;
use crate::trajectory::{resample, TrajectoryPolicy};

/// Default marker radius in pixels.
pub const DEFAULT_CIRCLE_RADIUS: u32 = 50;

/// Synthesizer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesizerOptions {
    /// Radius of the object marker and its mask
    pub circle_radius: u32,
    /// Handling of trajectories at least as long as the clip
    pub trajectory_policy: TrajectoryPolicy,
}

impl Default for SynthesizerOptions {
    fn default() -> Self {
        Self {
            circle_radius: DEFAULT_CIRCLE_RADIUS,
            trajectory_policy: TrajectoryPolicy::default(),
        }
    }
}

/// Builds motion signals from a source image and a motion spec.
///
/// Pure and deterministic: the same inputs always yield identical frames.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    options: SynthesizerOptions,
}

impl Synthesizer {
    pub fn new(options: SynthesizerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SynthesizerOptions {
        &self.options
    }

    /// Produce `frame_count` cue and mask frames for `spec`.
    pub fn synthesize(
        &self,
        image: &RgbImage,
        spec: &MotionSpec,
        frame_count: u32,
    ) -> MotionResult<MotionSignal> {
        if frame_count < 2 {
            return Err(MotionError::invalid_spec(format!(
                "frame count must be at least 2, got {}",
                frame_count
            )));
        }
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(MotionError::invalid_spec("source image is empty"));
        }

        let signal = match spec {
            MotionSpec::Object { trajectory } => {
                self.object_signal(image, trajectory, frame_count as usize)?
            }
            MotionSpec::Camera { camera_movement } => {
                self.camera_signal(image, camera_movement, frame_count as usize)?
            }
        };

        debug!(
            motion_type = %spec.motion_type(),
            frames = signal.len(),
            width = w,
            height = h,
            "Motion signal synthesized"
        );

        Ok(signal)
    }

    fn object_signal(
        &self,
        image: &RgbImage,
        trajectory: &[Point],
        frame_count: usize,
    ) -> MotionResult<MotionSignal> {
        if trajectory.is_empty() {
            return Err(MotionError::invalid_spec("trajectory is empty"));
        }
        if let Some(p) = trajectory.iter().find(|p| !p.is_normalized()) {
            return Err(MotionError::invalid_spec(format!(
                "trajectory point ({}, {}) is outside [0, 1]",
                p.x, p.y
            )));
        }

        let points = resample(trajectory, frame_count, self.options.trajectory_policy);
        let (cue, mask) = points
            .into_iter()
            .map(|p| render_frame(image, p, self.options.circle_radius))
            .unzip();

        Ok(MotionSignal { cue, mask })
    }

    fn camera_signal(
        &self,
        image: &RgbImage,
        movement: &CameraMovement,
        frame_count: usize,
    ) -> MotionResult<MotionSignal> {
        let kind = movement.camera_kind()?;
        let (w, h) = image.dimensions();

        let mut cue = Vec::with_capacity(frame_count);
        for i in 0..frame_count {
            let t = i as f64 / (frame_count - 1) as f64;
            let transform = transform_at(kind, movement, t, w, h)?;
            cue.push(warp(image, &transform)?);
        }

        let full = GrayImage::from_pixel(w, h, Luma([MASK_ON]));
        let mask = vec![full; frame_count];

        Ok(MotionSignal { cue, mask })
    }
}

/// Synthesize with default options.
pub fn synthesize(
    image: &RgbImage,
    spec: &MotionSpec,
    frame_count: u32,
) -> MotionResult<MotionSignal> {
    Synthesizer::default().synthesize(image, spec, frame_count)
}
