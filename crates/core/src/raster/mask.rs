//! Boolean raster masks

use crate::error::{Error, Result};
use crate::raster::GeoTransform;

/// A 2D boolean grid aligned with the rasters it was derived from.
///
/// Cells are stored row-major so a cell's flat index is `row * cols + col`,
/// the same indexing the pixel clusterer uses for its union-find arena.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
    transform: GeoTransform,
}

impl BinaryMask {
    /// All-false mask
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
            transform: GeoTransform::default(),
        }
    }

    /// Mask from row-major cells
    pub fn from_vec(cells: Vec<bool>, rows: usize, cols: usize) -> Result<Self> {
        if cells.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        Ok(Self {
            rows,
            cols,
            cells,
            transform: GeoTransform::default(),
        })
    }

    /// Mask whose cells are set wherever `f(row, col)` returns true
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(f(row, col));
            }
        }
        Self {
            rows,
            cols,
            cells,
            transform: GeoTransform::default(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether (row, col) is set; out-of-range cells read as unset
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[row * self.cols + col]
    }

    /// Whether the cell at a flat index is set
    #[inline]
    pub fn get_index(&self, index: usize) -> bool {
        self.cells.get(index).copied().unwrap_or(false)
    }

    /// Set the cell at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: bool) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        self.cells[row * self.cols + col] = value;
        Ok(())
    }

    /// Set the cell at a flat index; indices past the end are ignored
    #[inline]
    pub fn set_index(&mut self, index: usize, value: bool) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = value;
        }
    }

    /// Number of set cells
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Whether no cell is set
    pub fn none(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }

    /// Flat indices of set cells in row-major order
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| if c { Some(i) } else { None })
    }

    /// Row-major cells
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Split a flat index into (row, col)
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Builder-style variant of [`BinaryMask::set_transform`]
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }
}
