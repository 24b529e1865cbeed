//! JPEG encoding for crops, previews and saved best frames.

use std::path::Path;

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;

use crate::error::{Error, Result};

/// Encode an RGB image as JPEG at the given quality (1-100).
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|source| Error::ImageEncode { source })?;
    Ok(buffer)
}

/// Encode an RGB image as JPEG and write it to `path`.
pub fn save_jpeg(image: &RgbImage, path: &Path, quality: u8) -> Result<()> {
    let bytes = encode_jpeg(image, quality)?;
    std::fs::write(path, bytes).map_err(|e| Error::ImageWrite {
        path: path.to_path_buf(),
        source: image::ImageError::IoError(e),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_jpeg_magic() {
        let bytes = encode_jpeg(&RgbImage::new(16, 16), 80).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_save_jpeg_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best.jpg");
        save_jpeg(&RgbImage::new(8, 8), &path, 90).unwrap();
        assert!(path.exists());
    }
}
