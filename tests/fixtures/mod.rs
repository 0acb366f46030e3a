//! In-memory image fixtures

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Labelled sample frames the camera could send.
#[derive(Debug, Clone)]
pub struct FrameFixture {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub color: [u8; 3],
}

pub const FRAME_FIXTURES: &[FrameFixture] = &[
    FrameFixture {
        name: "qvga_green",
        width: 320,
        height: 240,
        color: [40, 160, 60],
    },
    FrameFixture {
        name: "vga_grey",
        width: 640,
        height: 480,
        color: [128, 128, 128],
    },
    FrameFixture {
        name: "svga_blue",
        width: 800,
        height: 600,
        color: [30, 60, 200],
    },
];

impl FrameFixture {
    /// Encode as JPEG, with a gradient so the frame is not a single flat block.
    pub fn jpeg(&self) -> Vec<u8> {
        let [r, g, b] = self.color;
        let img = RgbImage::from_fn(self.width, self.height, |x, _| {
            let shade = (x * 64 / self.width.max(1)) as u8;
            Rgb([r.saturating_add(shade), g, b])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .expect("encode fixture JPEG");
        buf
    }
}

/// The smallest fixture, for tests that only need a valid image.
pub fn sample_jpeg() -> Vec<u8> {
    FRAME_FIXTURES[0].jpeg()
}

/// First bytes of a JPEG only, as if the camera stopped mid-transfer.
pub fn truncated_jpeg() -> Vec<u8> {
    let mut bytes = sample_jpeg();
    bytes.truncate(10);
    bytes
}
