//! Pipeline input dimensions.

use image::imageops::FilterType;
use image::RgbImage;

/// Compute `(height, width)` for a source of `src_h x src_w` so that the
/// result keeps the aspect ratio, fits roughly `max_area` pixels and both
/// sides are multiples of `modulus` (at least one `modulus`).
pub fn compute_hw_from_area(src_h: u32, src_w: u32, max_area: u32, modulus: u32) -> (u32, u32) {
    let modulus = modulus.max(1);
    let aspect = src_h as f64 / src_w.max(1) as f64;
    let area = max_area as f64;

    let snap = |v: f64| -> u32 {
        let v = v.round() as u32;
        (v / modulus * modulus).max(modulus)
    };

    let height = snap((area * aspect).sqrt());
    let width = snap((area / aspect).sqrt());
    (height, width)
}

/// Resize `image` to exactly `width x height`.
pub fn resize_exact(image: &RgbImage, height: u32, width: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Lanczos3)
}
