// src/services/image_inspector.rs
use crate::errors::HeadshotError;
use image::{GenericImageView, ImageFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectedImage {
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

pub struct ImageInspector {
    max_dimension: u32,
}

impl ImageInspector {
    pub fn new() -> Self {
        Self {
            max_dimension: 8192,
        }
    }

    /// Detects the format from the bytes themselves.
    pub fn sniff_mime(&self, data: &[u8]) -> Result<&'static str, HeadshotError> {
        let format = image::guess_format(data)
            .map_err(|e| HeadshotError::ImageProcessing(format!("Unknown image format: {}", e)))?;

        mime_for_format(format).ok_or_else(|| {
            HeadshotError::ImageProcessing(format!("Unsupported image format: {:?}", format))
        })
    }

    /// Sniffs and fully decodes the image.
    pub fn verify(&self, data: &[u8]) -> Result<InspectedImage, HeadshotError> {
        let mime_type = self.sniff_mime(data)?;

        let img = image::load_from_memory(data)
            .map_err(|e| HeadshotError::ImageProcessing(format!("Invalid image data: {}", e)))?;

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(HeadshotError::ImageProcessing(
                "Image has no pixels".to_string(),
            ));
        }
        if width > self.max_dimension || height > self.max_dimension {
            return Err(HeadshotError::ImageProcessing(format!(
                "Image dimensions exceed {0}x{0}",
                self.max_dimension
            )));
        }

        Ok(InspectedImage {
            mime_type,
            width,
            height,
        })
    }
}

impl Default for ImageInspector {
    fn default() -> Self {
        Self::new()
    }
}

fn mime_for_format(format: ImageFormat) -> Option<&'static str> {
    let mime = match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Avif => "image/avif",
        _ => return None,
    };
    Some(mime)
}

/// File extension used when the result is downloaded.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/avif" => "avif",
        _ => "png",
    }
}
