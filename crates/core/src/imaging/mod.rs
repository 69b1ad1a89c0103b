//! Image decoding, channel normalization and grid assembly.

mod codec;
mod grid;

pub use codec::ImageRsCodec;
pub use grid::{CellPosition, Collage, CollageGrid, GridError};

use image::RgbImage;
use thiserror::Error;

/// Errors that can occur while decoding a payload.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// The payload had no bytes at all.
    #[error("Empty payload")]
    Empty,

    /// The bytes are not an image the codec understands.
    #[error("Decode failed: {0}")]
    Decode(String),
}

/// Decoder output before normalization: interleaved pixels with any channel count.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for RawImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("pixels", &self.pixels.len())
            .finish()
    }
}

/// A decoded image with exactly three channels.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage(RgbImage);

impl DecodedImage {
    pub fn from_rgb(image: RgbImage) -> Self {
        Self(image)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Always 3.
    pub fn channels(&self) -> u8 {
        3
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.0
    }
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Bring a raw decode result to three channels.
///
/// - 3 or more channels: the first three are kept, the rest dropped.
/// - 1 channel: gray is replicated into all three.
/// - 2 channels: gray is replicated, the second (alpha) channel dropped.
///
/// Returns `None` for images the grid cannot use: zero channels, zero area,
/// or a pixel buffer whose length does not match the header.
pub fn normalize(raw: RawImage) -> Option<DecodedImage> {
    let channels = raw.channels as usize;
    if channels == 0 || raw.width == 0 || raw.height == 0 {
        return None;
    }
    let expected = (raw.width as usize)
        .checked_mul(raw.height as usize)?
        .checked_mul(channels)?;
    if raw.pixels.len() != expected {
        return None;
    }

    let rgb: Vec<u8> = if channels == 3 {
        raw.pixels
    } else {
        raw.pixels
            .chunks_exact(channels)
            .flat_map(|px| {
                if channels >= 3 {
                    [px[0], px[1], px[2]]
                } else {
                    [px[0], px[0], px[0]]
                }
            })
            .collect()
    };

    RgbImage::from_raw(raw.width, raw.height, rgb).map(DecodedImage)
}

/// Seam over the image library.
///
/// Calls are synchronous; the assembly stage runs them on a blocking thread.
pub trait ImageCodec: Send + Sync {
    fn name(&self) -> &str;

    /// Decode an encoded image, keeping its native channel count.
    fn decode(&self, bytes: &[u8]) -> Result<RawImage, CodecError>;

    /// Resample to exactly `width` x `height`.
    fn resize(&self, image: &DecodedImage, width: u32, height: u32) -> DecodedImage;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> RawImage {
        RawImage {
            width,
            height,
            channels,
            pixels,
        }
    }

    #[test]
    fn test_normalize_gray_replicates() {
        let image = normalize(raw(2, 1, 1, vec![10, 200])).unwrap();
        assert_eq!(image.channels(), 3);
        assert_eq!(image.as_rgb().as_raw(), &vec![10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn test_normalize_gray_alpha_drops_alpha() {
        let image = normalize(raw(1, 1, 2, vec![77, 0])).unwrap();
        assert_eq!(image.as_rgb().as_raw(), &vec![77, 77, 77]);
    }

    #[test]
    fn test_normalize_rgb_is_unchanged() {
        let pixels = vec![1, 2, 3, 4, 5, 6];
        let image = normalize(raw(2, 1, 3, pixels.clone())).unwrap();
        assert_eq!(image.as_rgb().as_raw(), &pixels);
    }

    #[test]
    fn test_normalize_four_channels_keeps_first_three() {
        let image = normalize(raw(2, 1, 4, vec![1, 2, 3, 255, 4, 5, 6, 128])).unwrap();
        assert_eq!(image.channels(), 3);
        assert_eq!(image.as_rgb().as_raw(), &vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_normalize_rejects_unusable() {
        assert!(normalize(raw(1, 1, 0, vec![])).is_none());
        assert!(normalize(raw(0, 4, 3, vec![])).is_none());
        assert!(normalize(raw(2, 2, 3, vec![0; 5])).is_none());
    }
}
