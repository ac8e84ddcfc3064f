//! Generation request models and validation.

use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::defaults::{
    DEFAULT_GUIDANCE_SCALE, DEFAULT_NUM_FRAMES, DEFAULT_TSTRONG_INDEX_CAMERA,
    DEFAULT_TSTRONG_INDEX_OBJECT, DEFAULT_TWEAK_INDEX_CAMERA, DEFAULT_TWEAK_INDEX_OBJECT,
    MAX_GUIDANCE_SCALE, MAX_NUM_FRAMES, MAX_TRANSITION_INDEX, MIN_GUIDANCE_SCALE,
    MIN_NUM_FRAMES,
};
use crate::motion::{CameraMovement, MotionSpec, MotionType, Point};

/// Request rejected before a job is created.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid ({})", field, e.code),
                })
            })
            .collect();
        messages.sort();
        Self(messages.join("; "))
    }
}

/// Validated generation request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_finite_guidance"))]
pub struct GenerationRequest {
    /// Motion to synthesize
    #[validate(custom(function = "validate_motion"))]
    pub motion: MotionSpec,

    /// Text description of the desired clip
    #[validate(custom(function = "validate_prompt"))]
    pub prompt: String,

    /// Number of frames to generate
    #[validate(range(
        min = "MIN_NUM_FRAMES",
        max = "MAX_NUM_FRAMES",
        message = "num_frames must be between 16 and 161"
    ))]
    pub num_frames: u32,

    /// Classifier-free guidance scale
    #[validate(range(
        min = "MIN_GUIDANCE_SCALE",
        max = "MAX_GUIDANCE_SCALE",
        message = "guidance_scale must be between 1 and 20"
    ))]
    pub guidance_scale: f64,

    /// When to start denoising outside the mask
    #[validate(range(max = "MAX_TRANSITION_INDEX", message = "tweak_index must be between 0 and 50"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweak_index: Option<u32>,

    /// When to start denoising inside the mask
    #[validate(range(
        max = "MAX_TRANSITION_INDEX",
        message = "tstrong_index must be between 0 and 50"
    ))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tstrong_index: Option<u32>,

    /// Random seed for reproducibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Destination project for uploaded artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// Transition indices after motion-type defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedIndices {
    pub tweak_index: u32,
    pub tstrong_index: u32,
}

impl ResolvedIndices {
    /// Defaults for a motion type.
    pub fn defaults_for(motion_type: MotionType) -> Self {
        match motion_type {
            MotionType::Object => Self {
                tweak_index: DEFAULT_TWEAK_INDEX_OBJECT,
                tstrong_index: DEFAULT_TSTRONG_INDEX_OBJECT,
            },
            MotionType::Camera => Self {
                tweak_index: DEFAULT_TWEAK_INDEX_CAMERA,
                tstrong_index: DEFAULT_TSTRONG_INDEX_CAMERA,
            },
        }
    }
}

impl GenerationRequest {
    /// Create a request with default frame count and guidance.
    pub fn new(motion: MotionSpec, prompt: impl Into<String>) -> Self {
        Self {
            motion,
            prompt: prompt.into(),
            num_frames: DEFAULT_NUM_FRAMES,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            tweak_index: None,
            tstrong_index: None,
            seed: None,
            project_id: None,
        }
    }

    /// Run all field and motion checks.
    pub fn check(&self) -> Result<(), ValidationError> {
        self.validate().map_err(ValidationError::from)
    }

    /// Consume the request, returning it only if it is valid.
    pub fn validated(self) -> Result<Self, ValidationError> {
        self.check()?;
        Ok(self)
    }

    pub fn motion_type(&self) -> MotionType {
        self.motion.motion_type()
    }

    /// Fill absent transition indices with the motion-type defaults.
    pub fn resolved_indices(&self) -> ResolvedIndices {
        let defaults = ResolvedIndices::defaults_for(self.motion_type());
        ResolvedIndices {
            tweak_index: self.tweak_index.unwrap_or(defaults.tweak_index),
            tstrong_index: self.tstrong_index.unwrap_or(defaults.tstrong_index),
        }
    }
}

fn validate_prompt(prompt: &str) -> Result<(), validator::ValidationError> {
    if prompt.trim().is_empty() {
        return Err(field_error("prompt", "prompt is required and cannot be empty"));
    }
    Ok(())
}

/// Range checks let NaN through.
fn validate_finite_guidance(request: &GenerationRequest) -> Result<(), validator::ValidationError> {
    if !request.guidance_scale.is_finite() {
        return Err(field_error(
            "guidance_scale",
            "guidance_scale must be between 1 and 20",
        ));
    }
    Ok(())
}

fn validate_motion(motion: &MotionSpec) -> Result<(), validator::ValidationError> {
    match motion {
        MotionSpec::Object { trajectory } => {
            if trajectory.is_empty() {
                return Err(field_error(
                    "trajectory",
                    "trajectory is required for object motion",
                ));
            }
            if !trajectory.iter().all(Point::is_normalized) {
                return Err(field_error(
                    "trajectory",
                    "trajectory points must have x and y between 0 and 1",
                ));
            }
        }
        MotionSpec::Camera { camera_movement } => {
            if camera_movement.kind.trim().is_empty() {
                return Err(field_error(
                    "camera_movement",
                    "camera_movement.type is required for camera motion",
                ));
            }
            if camera_movement.params.values().any(|v| !v.is_finite()) {
                return Err(field_error(
                    "camera_movement",
                    "camera_movement.params must be finite numbers",
                ));
            }
        }
    }
    Ok(())
}

fn field_error(code: &'static str, message: &'static str) -> validator::ValidationError {
    validator::ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn default_num_frames() -> u32 {
    DEFAULT_NUM_FRAMES
}

fn default_guidance_scale() -> f64 {
    DEFAULT_GUIDANCE_SCALE
}

/// Flat request body as sent by the studio frontend.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationPayload {
    /// Type of motion control
    pub motion_type: MotionType,

    /// Text description of desired motion
    pub prompt: String,

    /// Object motion trajectory points
    #[serde(default)]
    pub trajectory: Option<Vec<Point>>,

    /// Camera movement specification
    #[serde(default)]
    pub camera_movement: Option<CameraMovement>,

    #[serde(default)]
    pub tweak_index: Option<u32>,

    #[serde(default)]
    pub tstrong_index: Option<u32>,

    #[serde(default = "default_num_frames")]
    pub num_frames: u32,

    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f64,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub project_id: Option<String>,
}

impl GenerationPayload {
    /// Convert into a validated request.
    ///
    /// The motion data matching `motion_type` must be present; data for the
    /// other motion type is ignored.
    pub fn into_request(self) -> Result<GenerationRequest, ValidationError> {
        let motion = match self.motion_type {
            MotionType::Object => MotionSpec::Object {
                trajectory: self.trajectory.ok_or_else(|| {
                    ValidationError::new("trajectory is required for object motion")
                })?,
            },
            MotionType::Camera => MotionSpec::Camera {
                camera_movement: self.camera_movement.ok_or_else(|| {
                    ValidationError::new("camera_movement is required for camera motion")
                })?,
            },
        };

        GenerationRequest {
            motion,
            prompt: self.prompt,
            num_frames: self.num_frames,
            guidance_scale: self.guidance_scale,
            tweak_index: self.tweak_index,
            tstrong_index: self.tstrong_index,
            seed: self.seed,
            project_id: self.project_id,
        }
        .validated()
    }
}
