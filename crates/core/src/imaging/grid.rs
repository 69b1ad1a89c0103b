//! Fixed-size composite grid, filled row-major.

use image::{imageops, RgbImage};
use serde::Serialize;
use thiserror::Error;

use crate::config::{CellSize, CollageSettings};

use super::DecodedImage;

/// Errors raised when placing a cell.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid is already full ({capacity} cells)")]
    Full { capacity: usize },

    #[error("image is {actual_width}x{actual_height}, cells are {cell_width}x{cell_height}")]
    SizeMismatch {
        actual_width: u32,
        actual_height: u32,
        cell_width: u32,
        cell_height: u32,
    },
}

/// Row and column of a placed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellPosition {
    pub row: u32,
    pub column: u32,
}

/// The composite while it is being filled.
///
/// The canvas is allocated at full size up front. Cells that are never filled
/// stay black, and [`finalize`](Self::finalize) crops away incomplete rows.
pub struct CollageGrid {
    rows: u32,
    columns: u32,
    cell: CellSize,
    canvas: RgbImage,
    filled: usize,
}

impl CollageGrid {
    pub fn new(settings: &CollageSettings) -> Self {
        let cell = settings.cell_size();
        Self {
            rows: settings.rows,
            columns: settings.columns,
            cell,
            canvas: RgbImage::new(settings.columns * cell.width, settings.rows * cell.height),
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_full(&self) -> bool {
        self.filled >= self.capacity()
    }

    pub fn cell_size(&self) -> CellSize {
        self.cell
    }

    /// Copy `image` into the next free cell.
    ///
    /// The image must already be resized to the cell size.
    pub fn place(&mut self, image: &DecodedImage) -> Result<CellPosition, GridError> {
        if self.is_full() {
            return Err(GridError::Full {
                capacity: self.capacity(),
            });
        }
        if image.width() != self.cell.width || image.height() != self.cell.height {
            return Err(GridError::SizeMismatch {
                actual_width: image.width(),
                actual_height: image.height(),
                cell_width: self.cell.width,
                cell_height: self.cell.height,
            });
        }

        let position = CellPosition {
            row: (self.filled / self.columns as usize) as u32,
            column: (self.filled % self.columns as usize) as u32,
        };
        let x = position.column as i64 * self.cell.width as i64;
        let y = position.row as i64 * self.cell.height as i64;
        imageops::replace(&mut self.canvas, image.as_rgb(), x, y);

        self.filled += 1;
        Ok(position)
    }

    /// Keep only completed rows: `floor(filled / columns)` of them.
    pub fn finalize(self) -> Collage {
        let rows = (self.filled / self.columns as usize) as u32;
        let image = if rows == self.rows {
            self.canvas
        } else {
            imageops::crop_imm(
                &self.canvas,
                0,
                0,
                self.canvas.width(),
                rows * self.cell.height,
            )
            .to_image()
        };

        Collage {
            image,
            rows,
            columns: self.columns,
            filled_cells: self.filled,
        }
    }
}

impl std::fmt::Debug for CollageGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollageGrid")
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .field("cell", &self.cell)
            .field("filled", &self.filled)
            .finish()
    }
}

/// Finished composite.
pub struct Collage {
    image: RgbImage,
    rows: u32,
    columns: u32,
    filled_cells: usize,
}

impl Collage {
    /// `(height, width, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.image.height() as usize, self.image.width() as usize, 3)
    }

    /// Completed rows kept in the image.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Cells filled before finalization, including any in a dropped partial row.
    pub fn filled_cells(&self) -> usize {
        self.filled_cells
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

impl std::fmt::Debug for Collage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collage")
            .field("shape", &self.shape())
            .field("rows", &self.rows)
            .field("filled_cells", &self.filled_cells)
            .finish()
    }
}
