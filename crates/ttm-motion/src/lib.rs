//! Motion signal synthesis.
//!
//! Turns a still image and a motion specification into the guidance signal
//! consumed by the generation pipeline:
//! - a cue video showing where motion happens
//! - a binary mask video marking the affected region
//!
//! Object motion draws a marker along a resampled trajectory; camera motion
//! warps the whole frame (zoom, pan, orbit) with a full-frame mask.

pub mod camera;
pub mod error;
pub mod object;
pub mod signal;
pub mod synthesizer;
pub mod trajectory;

pub use error::{MotionError, MotionResult};
pub use signal::MotionSignal;
pub use synthesizer::{synthesize, Synthesizer, SynthesizerOptions, DEFAULT_CIRCLE_RADIUS};
pub use trajectory::TrajectoryPolicy;
