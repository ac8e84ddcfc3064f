//! Generation defaults shared by the API and the worker.

/// Default number of frames to generate.
pub const DEFAULT_NUM_FRAMES: u32 = 81;

/// Minimum / maximum accepted frame counts.
pub const MIN_NUM_FRAMES: u32 = 16;
pub const MAX_NUM_FRAMES: u32 = 161;

/// Frame rate of motion signals and output clips.
pub const DEFAULT_FPS: u32 = 16;

/// Default classifier-free guidance scale.
pub const DEFAULT_GUIDANCE_SCALE: f64 = 3.5;

/// Minimum / maximum accepted guidance scale.
pub const MIN_GUIDANCE_SCALE: f64 = 1.0;
pub const MAX_GUIDANCE_SCALE: f64 = 20.0;

/// Upper bound for tweak/tstrong indices.
pub const MAX_TRANSITION_INDEX: u32 = 50;

/// Denoising steps passed to the pipeline.
pub const DEFAULT_NUM_INFERENCE_STEPS: u32 = 50;

/// Pixel-area budget for the pipeline input (480 x 832).
pub const DEFAULT_MAX_AREA: u32 = 480 * 832;

// Motion control defaults
pub const DEFAULT_TWEAK_INDEX_OBJECT: u32 = 3;
pub const DEFAULT_TSTRONG_INDEX_OBJECT: u32 = 7;
pub const DEFAULT_TWEAK_INDEX_CAMERA: u32 = 2;
pub const DEFAULT_TSTRONG_INDEX_CAMERA: u32 = 5;

/// Largest accepted source image upload.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;
