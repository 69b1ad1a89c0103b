//! Writing the finished collage to disk.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use thiserror::Error;
use tracing::info;

use crate::imaging::Collage;

#[derive(Debug, Error)]
pub enum OutputError {
    /// Not even one row was completed.
    #[error("Collage has no complete rows")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode collage: {0}")]
    Encode(String),
}

/// Where a collage with `title` goes inside `dir`.
///
/// Anything other than ASCII letters, digits, `-`, `_` and `.` becomes `_`.
pub fn output_path(dir: &Path, title: &str) -> PathBuf {
    let name: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{}.png", name))
}

/// Encode `collage` as PNG at `path`, creating the parent directory.
pub fn write_collage(collage: &Collage, path: &Path) -> Result<(), OutputError> {
    if collage.is_empty() {
        return Err(OutputError::Empty);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    collage
        .image()
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| OutputError::Encode(e.to_string()))?;

    let (height, width, _) = collage.shape();
    info!(path = %path.display(), width, height, "Collage written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{CollageGrid, DecodedImage};
    use crate::testing::fixtures;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn collage(rows: u32, columns: u32, cells: usize) -> Collage {
        let mut grid = CollageGrid::new(&fixtures::settings(rows, columns, "4,3"));
        for _ in 0..cells {
            grid.place(&DecodedImage::from_rgb(RgbImage::from_pixel(4, 3, Rgb([9, 8, 7]))))
                .unwrap();
        }
        grid.finalize()
    }

    #[test]
    fn test_output_path_sanitizes_title() {
        let path = output_path(Path::new("out"), "red panda/zoo_2024-06-15_10-30-05");
        assert_eq!(path, PathBuf::from("out/red_panda_zoo_2024-06-15_10-30-05.png"));
    }

    #[test]
    fn test_write_collage_round_trips_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("collage.png");

        write_collage(&collage(2, 3, 6), &path).unwrap();

        let written = image::open(&path).unwrap().into_rgb8();
        assert_eq!((written.width(), written.height()), (12, 6));
    }

    #[test]
    fn test_write_empty_collage_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.png");

        let result = write_collage(&collage(2, 3, 2), &path);
        assert!(matches!(result, Err(OutputError::Empty)));
        assert!(!path.exists());
    }
}
