//! Object trajectory rendering.

use image::{GrayImage, Luma, Pixel, RgbImage};
use ttm_models::Point;

/// Marker color drawn on cue frames.
pub const CUE_COLOR: [u8; 3] = [255, 0, 0];

/// Mask value for pixels inside the moving region.
pub const MASK_ON: u8 = 255;

/// Pixel center for a normalized point: `(floor(x*w), floor(y*h))`.
pub fn denormalize(point: Point, width: u32, height: u32) -> (i64, i64) {
    (
        (point.x * width as f64).floor() as i64,
        (point.y * height as f64).floor() as i64,
    )
}

/// Fill a disc of `radius` around `(cx, cy)`, clipped to the image.
pub fn fill_circle<P: Pixel>(
    img: &mut image::ImageBuffer<P, Vec<P::Subpixel>>,
    cx: i64,
    cy: i64,
    radius: u32,
    value: P,
) {
    let (w, h) = img.dimensions();
    let r = radius as i64;
    let r2 = (r as i128) * (r as i128);

    // Centers further out than this cannot reach the image.
    let cx = cx.clamp(-r - 1, w as i64 + r + 1);
    let cy = cy.clamp(-r - 1, h as i64 + r + 1);

    let x_start = (cx - r).max(0);
    let x_end = (cx + r).min(w as i64 - 1);
    let y_start = (cy - r).max(0);
    let y_end = (cy + r).min(h as i64 - 1);

    for y in y_start..=y_end {
        let dy = (y - cy) as i128;
        for x in x_start..=x_end {
            let dx = (x - cx) as i128;
            if dx * dx + dy * dy <= r2 {
                img.put_pixel(x as u32, y as u32, value);
            }
        }
    }
}

/// Cue and mask frames for one trajectory position.
pub fn render_frame(source: &RgbImage, point: Point, radius: u32) -> (RgbImage, GrayImage) {
    let (w, h) = source.dimensions();
    let (cx, cy) = denormalize(point, w, h);

    let mut cue = source.clone();
    fill_circle(&mut cue, cx, cy, radius, image::Rgb(CUE_COLOR));

    let mut mask = GrayImage::new(w, h);
    fill_circle(&mut mask, cx, cy, radius, Luma([MASK_ON]));

    (cue, mask)
}
