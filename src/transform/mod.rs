//! Image decoding, resizing, compositing and encoding.

pub mod ops;

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::HandlerError;

/// A decoded image together with its detected source format.
#[derive(Debug)]
pub struct ImageHandle {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl ImageHandle {
    /// Decodes image bytes, sniffing the format from the content.
    pub fn decode(bytes: &[u8]) -> Result<Self, HandlerError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|err| HandlerError::transform_failed(err.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| HandlerError::transform_failed("unrecognized image format"))?;
        let image = reader
            .decode()
            .map_err(|err| HandlerError::transform_failed(err.to_string()))?;
        Ok(Self { image, format })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Lowercase name of the source format, e.g. "jpeg" or "png".
    pub fn format_name(&self) -> String {
        match self.format {
            ImageFormat::Jpeg => "jpeg".to_string(),
            ImageFormat::Png => "png".to_string(),
            ImageFormat::WebP => "webp".to_string(),
            ImageFormat::Gif => "gif".to_string(),
            other => format!("{:?}", other).to_lowercase(),
        }
    }

    /// Resizes to the given dimensions. A single dimension keeps the
    /// aspect ratio; no dimensions is a no-op.
    pub fn resize(&mut self, width: Option<u32>, height: Option<u32>) {
        let (target_width, target_height) = match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, scaled(self.height(), w, self.width())),
            (None, Some(h)) => (scaled(self.width(), h, self.height()), h),
            (None, None) => return,
        };
        self.image = self
            .image
            .resize_exact(target_width, target_height, FilterType::Lanczos3);
    }

    /// Draws `overlay` onto this image anchored at the top-left corner.
    pub fn composite(&mut self, overlay: &DynamicImage) {
        imageops::overlay(&mut self.image, overlay, 0, 0);
    }

    /// Encodes into the named format.
    pub fn to_bytes(&self, format: &str) -> Result<Vec<u8>, HandlerError> {
        let mut buffer = Cursor::new(Vec::new());
        let result = match format {
            "jpeg" | "jpg" => {
                // JPEG has no alpha channel
                DynamicImage::ImageRgb8(self.image.to_rgb8())
                    .write_to(&mut buffer, ImageFormat::Jpeg)
            }
            "png" => self.image.write_to(&mut buffer, ImageFormat::Png),
            // The WebP and GIF encoders only accept 8-bit RGB(A)
            "webp" => DynamicImage::ImageRgba8(self.image.to_rgba8())
                .write_to(&mut buffer, ImageFormat::WebP),
            "gif" => DynamicImage::ImageRgba8(self.image.to_rgba8())
                .write_to(&mut buffer, ImageFormat::Gif),
            other => {
                return Err(HandlerError::transform_failed(format!(
                    "unsupported output format: {}",
                    other
                )))
            }
        };
        result.map_err(|err| HandlerError::transform_failed(err.to_string()))?;
        Ok(buffer.into_inner())
    }
}

fn scaled(side: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return side.max(1);
    }
    (((side as u64) * (numerator as u64) + (denominator as u64) / 2) / (denominator as u64))
        .max(1) as u32
}
