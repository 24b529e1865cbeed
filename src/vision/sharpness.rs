//! Crop sharpness measure.

use image::{RgbImage, imageops};

/// Variance of the 4-neighbour Laplacian over the grayscale image.
///
/// Higher values mean more edge energy, i.e. a sharper crop. Images smaller
/// than 3x3 have no interior and score 0.
#[allow(clippy::cast_precision_loss)]
pub fn laplacian_variance(image: &RgbImage) -> f64 {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let gray = imageops::grayscale(image);
    let at = |x: u32, y: u32| f64::from(gray.get_pixel(x, y).0[0]);

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0u64;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let lap = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            sum += lap;
            sum_sq += lap * lap;
            count += 1;
        }
    }

    let n = count as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}
