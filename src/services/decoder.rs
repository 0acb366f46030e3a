use std::time::Duration;

use image::DynamicImage;
use tokio::time::sleep;

/// How often, and how patiently, to retry decoding an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_millis(20),
        }
    }
}

/// Decode an image that may still be arriving from the camera.
///
/// Each failed attempt waits `policy.interval` before the next one. After
/// `policy.max_attempts` failures the last decoder error is returned.
pub async fn decode_with_retry(
    bytes: &[u8],
    policy: &RetryPolicy,
) -> Result<DynamicImage, DecodeError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::from("no attempts made");

    for attempt in 1..=max_attempts {
        match decode_once(bytes) {
            Ok(image) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "Image decoded after retry");
                }
                return Ok(image);
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    bytes = bytes.len(),
                    error = %e,
                    "Image not fully decodable yet"
                );
                last_error = e.to_string();
            }
        }

        if attempt < max_attempts {
            sleep(policy.interval).await;
        }
    }

    tracing::error!(attempts = max_attempts, "Failed to decode image");
    Err(DecodeError::Exhausted {
        attempts: max_attempts,
        last_error,
    })
}

/// Single full decode, format sniffed from the bytes.
pub fn decode_once(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("could not decode image after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::time::Instant;

    fn jpeg_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(16, 8, |x, _| image::Rgb([x as u8 * 10, 80, 160]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_valid_jpeg_decodes_first_try() {
        let bytes = jpeg_bytes();
        let policy = RetryPolicy {
            max_attempts: 5,
            interval: Duration::from_millis(200),
        };
        let start = Instant::now();
        let image = decode_with_retry(&bytes, &policy).await.unwrap();
        assert_eq!((image.width(), image.height()), (16, 8));
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_empty_buffer_exhausts_attempts() {
        let policy = RetryPolicy {
            max_attempts: 5,
            interval: Duration::from_millis(20),
        };
        let start = Instant::now();
        let err = decode_with_retry(&[], &policy).await.unwrap_err();
        let DecodeError::Exhausted { attempts, .. } = &err;
        assert_eq!(*attempts, 5);
        assert!(err.to_string().contains("after 5 attempts"));
        // four pauses between five attempts
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_truncated_jpeg_fails() {
        let bytes = jpeg_bytes();
        let truncated = &bytes[..10];
        let policy = RetryPolicy {
            max_attempts: 2,
            interval: Duration::from_millis(1),
        };
        assert!(decode_with_retry(truncated, &policy).await.is_err());
    }
}
