//! Uploaded image handling.

use image::ImageFormat;
use yatube_common::{AppError, AppResult};

/// Image formats accepted for post images.
pub const ACCEPTED_IMAGE_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Gif,
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
];

/// An image file received with a post submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// File name supplied by the client.
    pub file_name: String,
    /// Raw file contents.
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// Create an upload from a file name and its contents.
    #[must_use]
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    /// Detect the image format from the file contents.
    pub fn format(&self) -> AppResult<ImageFormat> {
        detect_image_format(&self.data)
    }
}

/// Detect the format of an image from its magic bytes, rejecting
/// anything that is not an accepted image.
pub fn detect_image_format(data: &[u8]) -> AppResult<ImageFormat> {
    if data.is_empty() {
        return Err(AppError::Validation("The submitted file is empty.".to_string()));
    }

    let format = image::guess_format(data)
        .map_err(|_| AppError::Validation("Upload a valid image.".to_string()))?;

    if ACCEPTED_IMAGE_FORMATS.contains(&format) {
        Ok(format)
    } else {
        Err(AppError::Validation("Upload a valid image.".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    #[test]
    fn test_detect_gif() {
        assert_eq!(detect_image_format(SMALL_GIF).unwrap(), ImageFormat::Gif);
    }

    #[test]
    fn test_detect_png_header() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(detect_image_format(&png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_rejects_text() {
        let result = detect_image_format(b"definitely not an image");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(detect_image_format(&[]).is_err());
    }

    #[test]
    fn test_upload_format() {
        let upload = ImageUpload::new("small.gif", SMALL_GIF.to_vec());
        assert_eq!(upload.format().unwrap(), ImageFormat::Gif);
    }
}
