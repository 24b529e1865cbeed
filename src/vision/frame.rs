//! Captured video frame.

use image::{GrayImage, RgbImage, imageops};

use super::PixelRect;

/// One captured RGB frame, owned by the detection loop for the duration of a step.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap an RGB image.
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from packed RGB24 bytes.
    ///
    /// Returns `None` when the buffer length does not match the dimensions.
    pub fn from_rgb24(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::new)
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the frame has no pixels.
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// Borrow the underlying image.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Raw packed RGB24 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Copy out a region of the frame.
    pub fn crop(&self, rect: PixelRect) -> RgbImage {
        imageops::crop_imm(&self.image, rect.x, rect.y, rect.width, rect.height).to_image()
    }

    /// Grayscale copy of the frame.
    pub fn luma(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }

    /// Mean luma on a 0-255 scale.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_luma(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let gray = self.luma();
        let total: u64 = gray.pixels().map(|p| u64::from(p.0[0])).sum();
        total as f64 / f64::from(gray.width() * gray.height())
    }
}
