//! Camera movement rendering via affine warps.

use image::{Rgb, RgbImage};
use ttm_models::{CameraKind, CameraMovement};

use crate::error::{MotionError, MotionResult};

/// Default zoom amount reached at the last frame (scale 1.5).
pub const DEFAULT_ZOOM_AMOUNT: f64 = 0.5;

/// Default orbit angle in degrees reached at the last frame.
pub const DEFAULT_ORBIT_ANGLE: f64 = 30.0;

/// 2x3 affine matrix mapping source coordinates to destination coordinates:
/// `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            c: dx,
            f: dy,
            ..Self::IDENTITY
        }
    }

    /// Rotation by `angle_deg` (counter-clockwise on screen) combined with
    /// uniform `scale`, both about `(cx, cy)`.
    pub fn rotation_scale(cx: f64, cy: f64, angle_deg: f64, scale: f64) -> Self {
        let theta = angle_deg.to_radians();
        let alpha = scale * theta.cos();
        let beta = scale * theta.sin();
        Self {
            a: alpha,
            b: beta,
            c: (1.0 - alpha) * cx - beta * cy,
            d: -beta,
            e: alpha,
            f: beta * cx + (1.0 - alpha) * cy,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Self> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let a = self.e / det;
        let b = -self.b / det;
        let d = -self.d / det;
        let e = self.a / det;
        Some(Self {
            a,
            b,
            c: -(a * self.c + b * self.f),
            d,
            e,
            f: -(d * self.c + e * self.f),
        })
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }
}

/// Transform for `movement` at normalized time `t` in [0, 1].
pub fn transform_at(
    kind: CameraKind,
    movement: &CameraMovement,
    t: f64,
    width: u32,
    height: u32,
) -> MotionResult<Affine> {
    let (w, h) = (width as f64, height as f64);
    let (cx, cy) = (w / 2.0, h / 2.0);

    let transform = match kind {
        CameraKind::Zoom => {
            let amount = finite_param(movement, "amount", DEFAULT_ZOOM_AMOUNT)?;
            Affine::rotation_scale(cx, cy, 0.0, 1.0 + t * amount)
        }
        CameraKind::Pan => {
            let dx = finite_param(movement, "dx", 0.0)?;
            let dy = finite_param(movement, "dy", 0.0)?;
            Affine::translation(t * dx * w, t * dy * h)
        }
        CameraKind::Orbit => {
            let angle = finite_param(movement, "angle", DEFAULT_ORBIT_ANGLE)?;
            Affine::rotation_scale(cx, cy, t * angle, 1.0)
        }
    };

    Ok(transform)
}

fn finite_param(movement: &CameraMovement, name: &str, default: f64) -> MotionResult<f64> {
    let value = movement.param(name, default);
    if !value.is_finite() {
        return Err(MotionError::invalid_spec(format!(
            "camera parameter '{}' must be finite",
            name
        )));
    }
    Ok(value)
}

/// Warp `src` by `transform` with bilinear sampling; pixels that map
/// outside the source are black.
pub fn warp(src: &RgbImage, transform: &Affine) -> MotionResult<RgbImage> {
    if transform.is_identity() {
        return Ok(src.clone());
    }

    let inverse = transform
        .invert()
        .ok_or_else(|| MotionError::invalid_spec("camera transform is degenerate"))?;

    let (w, h) = src.dimensions();
    Ok(RgbImage::from_fn(w, h, |x, y| {
        let (sx, sy) = inverse.apply(x as f64, y as f64);
        sample_bilinear(src, sx, sy)
    }))
}

fn sample_bilinear(src: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = src.dimensions();
    if !(x > -1.0 && y > -1.0 && x < w as f64 && y < h as f64) {
        return Rgb([0, 0, 0]);
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ];

    let mut acc = [0.0f64; 3];
    for (dx, dy, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        let px = x0 + dx;
        let py = y0 + dy;
        if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
            continue;
        }
        let pixel = src.get_pixel(px as u32, py as u32);
        for (channel, value) in acc.iter_mut().enumerate() {
            *value += weight * pixel[channel] as f64;
        }
    }

    Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8))
}
