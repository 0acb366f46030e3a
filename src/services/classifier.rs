use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};

use crate::models::classification::ClassificationResult;

/// Instruction sent alongside every image.
pub const CLASSIFY_PROMPT: &str = concat!(
    "Identify EXACTLY what item is in the image. Give the basic interpretation of the item ",
    "(e.g., Coca-Cola can, plastic bottle, tissue, cardboard box; nuts and bolts count as metal). ",
    "Then on the next line, output ONLY its recycling category as one word: Plastic, Paper, Metal, or Trash. ",
    "Try to fit the item into Plastic, Paper or Metal; use Trash only when none of them applies.\n",
    "Format:\n",
    "Item: <name>\n",
    "Category: <one word>"
);

pub const UPLOAD_MIME_TYPE: &str = "image/jpeg";

/// External image classification service.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one decoded camera frame.
    async fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult, ClassifyError>;
}

/// Undo the camera's upside-down mounting.
pub fn orient(image: &DynamicImage) -> DynamicImage {
    image.rotate180()
}

/// Orient a frame and re-encode it as JPEG for transmission.
pub fn prepare_upload(image: &DynamicImage) -> Result<Vec<u8>, ClassifyError> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(orient(image).to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(ClassifyError::Encode)?;
    Ok(buf)
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classification service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("classification service returned no text")]
    EmptyResponse,

    #[error("failed to encode image for upload: {0}")]
    Encode(#[source] image::ImageError),

    #[error("classification timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_orient_rotates_half_turn() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        let rotated = orient(&DynamicImage::ImageRgb8(img)).to_rgb8();
        assert_eq!(rotated.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(rotated.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_prepare_upload_emits_jpeg_for_rgba() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 128])));
        let bytes = prepare_upload(&img).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn test_prompt_asks_for_two_lines() {
        assert!(CLASSIFY_PROMPT.contains("Item: <name>"));
        assert!(CLASSIFY_PROMPT.contains("Category: <one word>"));
    }
}
