//! Normalized and pixel-space box geometry.

use serde::{Deserialize, Serialize};

/// Bounding box in normalized `[x1, y1, x2, y2]` coordinates (0.0 - 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BBox(pub [f32; 4]);

impl BBox {
    /// Build a box from corner coordinates.
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self([x1, y1, x2, y2])
    }

    /// Box center.
    pub fn center(&self) -> (f32, f32) {
        let [x1, y1, x2, y2] = self.0;
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }

    /// Box width.
    pub fn width(&self) -> f32 {
        (self.0[2] - self.0[0]).max(0.0)
    }

    /// Box height.
    pub fn height(&self) -> f32 {
        (self.0[3] - self.0[1]).max(0.0)
    }

    /// Box area.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &Self) -> f32 {
        let ix1 = self.0[0].max(other.0[0]);
        let iy1 = self.0[1].max(other.0[1]);
        let ix2 = self.0[2].min(other.0[2]);
        let iy2 = self.0[3].min(other.0[3]);
        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Whether the center lies at least `margin` away from every frame edge.
    pub fn center_within_margin(&self, margin: f32) -> bool {
        let (cx, cy) = self.center();
        cx >= margin && cx <= 1.0 - margin && cy >= margin && cy <= 1.0 - margin
    }

    /// Coordinates rounded to two decimals, as stored in track trails.
    pub fn rounded(&self) -> Self {
        Self(self.0.map(|v| (v * 100.0).round() / 100.0))
    }

    /// Whether every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Pixel rectangle in a frame of the given size, truncated and clamped.
    ///
    /// Returns `None` when the clamped rectangle is empty.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn to_pixels(&self, width: u32, height: u32) -> Option<PixelRect> {
        let w = width as f32;
        let h = height as f32;
        let x1 = (self.0[0] * w).max(0.0) as u32;
        let y1 = (self.0[1] * h).max(0.0) as u32;
        let x2 = ((self.0[2] * w).max(0.0) as u32).min(width);
        let y2 = ((self.0[3] * h).max(0.0) as u32).min(height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(PixelRect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

/// Rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_center_margin() {
        assert!(BBox::new(0.4, 0.4, 0.6, 0.6).center_within_margin(0.1));
        assert!(!BBox::new(0.0, 0.4, 0.1, 0.6).center_within_margin(0.1));
        assert!(!BBox::new(0.4, 0.9, 0.6, 1.0).center_within_margin(0.1));
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = BBox::new(0.1, 0.1, 0.3, 0.3);
        let b = BBox::new(0.6, 0.6, 0.8, 0.8);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_to_pixels_clamps() {
        let rect = BBox::new(-0.1, 0.5, 1.2, 1.0).to_pixels(100, 50).unwrap();
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 25);
        assert_eq!(rect.width, 100);
        assert_eq!(rect.height, 25);
    }

    #[test]
    fn test_to_pixels_empty() {
        assert!(BBox::new(0.5, 0.5, 0.5, 0.9).to_pixels(100, 100).is_none());
    }

    #[test]
    fn test_rounded() {
        assert_eq!(BBox::new(0.123, 0.456, 0.789, 0.999).rounded().0[0], 0.12);
    }
}
