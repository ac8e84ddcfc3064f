//! Motion specification models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A normalized trajectory point; both axes are expected in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates are finite and inside [0, 1].
    pub fn is_normalized(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && (0.0..=1.0).contains(&self.x)
            && (0.0..=1.0).contains(&self.y)
    }
}

/// Kind of motion a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    /// Move a region of the image along a trajectory
    Object,
    /// Move the virtual camera over the whole image
    Camera,
}

impl MotionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionType::Object => "object",
            MotionType::Camera => "camera",
        }
    }
}

impl fmt::Display for MotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported camera movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CameraKind {
    /// Translate the frame
    Pan,
    /// Scale about the image center
    Zoom,
    /// Rotate about the image center
    Orbit,
}

impl CameraKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraKind::Pan => "pan",
            CameraKind::Zoom => "zoom",
            CameraKind::Orbit => "orbit",
        }
    }
}

impl fmt::Display for CameraKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CameraKind {
    type Err = CameraKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pan" => Ok(CameraKind::Pan),
            "zoom" => Ok(CameraKind::Zoom),
            "orbit" => Ok(CameraKind::Orbit),
            _ => Err(CameraKindParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unsupported camera movement: {0}")]
pub struct CameraKindParseError(pub String);

/// Camera movement as sent by clients.
///
/// The movement type stays a free-form string on the wire so that
/// unknown movements reach the synthesizer and fail there with a
/// descriptive error instead of a generic deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CameraMovement {
    /// Movement type: pan, zoom or orbit
    #[serde(rename = "type")]
    pub kind: String,
    /// Movement-specific numeric parameters
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl CameraMovement {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter setter.
    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Parse the movement type.
    pub fn camera_kind(&self) -> Result<CameraKind, CameraKindParseError> {
        self.kind.parse()
    }

    /// Look up a parameter, falling back to `default`.
    pub fn param(&self, name: &str, default: f64) -> f64 {
        self.params.get(name).copied().unwrap_or(default)
    }
}

/// Motion specification: exactly one of an object trajectory or a camera movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "motion_type", rename_all = "snake_case")]
pub enum MotionSpec {
    Object { trajectory: Vec<Point> },
    Camera { camera_movement: CameraMovement },
}

impl MotionSpec {
    pub fn object(trajectory: Vec<Point>) -> Self {
        MotionSpec::Object { trajectory }
    }

    pub fn camera(camera_movement: CameraMovement) -> Self {
        MotionSpec::Camera { camera_movement }
    }

    pub fn motion_type(&self) -> MotionType {
        match self {
            MotionSpec::Object { .. } => MotionType::Object,
            MotionSpec::Camera { .. } => MotionType::Camera,
        }
    }
}
