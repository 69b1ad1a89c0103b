use image::imageops::{self, FilterType};
use tracing::trace;

use super::{CodecError, DecodedImage, ImageCodec, RawImage};

/// [`ImageCodec`] backed by the `image` crate.
///
/// Format is sniffed from the bytes. Resizing uses a triangle (bilinear) filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRsCodec;

impl ImageRsCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for ImageRsCodec {
    fn name(&self) -> &str {
        "image-rs"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RawImage, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }

        let decoded =
            image::load_from_memory(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
        let color = decoded.color();

        let (channels, width, height, pixels) = match (color.has_color(), color.has_alpha()) {
            (false, false) => {
                let buf = decoded.into_luma8();
                (1, buf.width(), buf.height(), buf.into_raw())
            }
            (false, true) => {
                let buf = decoded.into_luma_alpha8();
                (2, buf.width(), buf.height(), buf.into_raw())
            }
            (true, false) => {
                let buf = decoded.into_rgb8();
                (3, buf.width(), buf.height(), buf.into_raw())
            }
            (true, true) => {
                let buf = decoded.into_rgba8();
                (4, buf.width(), buf.height(), buf.into_raw())
            }
        };

        trace!(width, height, channels, ?color, "Decoded payload");
        Ok(RawImage {
            width,
            height,
            channels,
            pixels,
        })
    }

    fn resize(&self, image: &DecodedImage, width: u32, height: u32) -> DecodedImage {
        if image.width() == width && image.height() == height {
            return image.clone();
        }
        DecodedImage::from_rgb(imageops::resize(
            image.as_rgb(),
            width,
            height,
            FilterType::Triangle,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::normalize;
    use crate::testing::fixtures;

    #[test]
    fn test_decode_reports_native_channels() {
        let codec = ImageRsCodec::new();
        for channels in [1u8, 2, 3, 4] {
            let raw = codec.decode(&fixtures::png_bytes(8, 6, channels)).unwrap();
            assert_eq!(raw.channels, channels);
            assert_eq!((raw.width, raw.height), (8, 6));
            assert_eq!(raw.pixels.len(), 8 * 6 * channels as usize);
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = ImageRsCodec::new();
        assert!(matches!(
            codec.decode(&fixtures::corrupt_bytes()),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(codec.decode(&[]), Err(CodecError::Empty)));
    }

    #[test]
    fn test_resize_to_cell() {
        let codec = ImageRsCodec::new();
        let raw = codec.decode(&fixtures::png_bytes(50, 30, 4)).unwrap();
        let image = normalize(raw).unwrap();

        let resized = codec.resize(&image, 24, 18);
        assert_eq!((resized.width(), resized.height()), (24, 18));
        assert_eq!(resized.channels(), 3);
    }
}
