//! Testing utilities and mock implementations.
//!
//! This module provides a mock of the remote photo service and fixtures that
//! synthesize real image payloads, so the whole pipeline can be exercised
//! without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use collage_core::testing::{fixtures, MockPhotoService};
//!
//! let service = MockPhotoService::new();
//! service.add_photo("1", true, fixtures::png_bytes(64, 48, 4)).await;
//! service.add_photo("2", true, fixtures::corrupt_bytes()).await;
//!
//! let settings = fixtures::settings(1, 2, "32,24");
//! ```

mod mock_photo_service;

pub use mock_photo_service::MockPhotoService;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Cursor;

    use chrono::{NaiveDate, NaiveDateTime};
    use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, RgbImage, RgbaImage};

    use crate::config::CollageSettings;

    /// Fixed run start used by fixtures.
    pub fn started_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .and_then(|d| d.and_hms_opt(10, 30, 5))
            .expect("valid fixture timestamp")
    }

    /// Valid settings for a `rows` x `columns` grid with cells of `size` ("W,H").
    pub fn settings(rows: u32, columns: u32, size: &str) -> CollageSettings {
        CollageSettings::new("fixture", 100, rows, columns, size, started_at())
            .expect("fixture settings must be valid")
    }

    /// A PNG of the given size with 1 (gray), 2 (gray+alpha), 3 (RGB) or 4 (RGBA) channels.
    pub fn png_bytes(width: u32, height: u32, channels: u8) -> Vec<u8> {
        let shade = |x: u32, y: u32| ((x * 7 + y * 13) % 256) as u8;

        let image = match channels {
            1 => DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
                image::Luma([shade(x, y)])
            })),
            2 => DynamicImage::ImageLumaA8(GrayAlphaImage::from_fn(width, height, |x, y| {
                image::LumaA([shade(x, y), 200])
            })),
            3 => DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                image::Rgb([shade(x, y), 64, 255 - shade(x, y)])
            })),
            4 => DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
                image::Rgba([shade(x, y), 128, 32, 90])
            })),
            other => panic!("unsupported channel count {}", other),
        };

        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .expect("PNG encoding of fixture");
        buf.into_inner()
    }

    /// Bytes with a PNG signature that do not decode.
    pub fn corrupt_bytes() -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(b"definitely not an image");
        bytes
    }
}
