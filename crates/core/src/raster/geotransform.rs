//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// For north-up images, `row_rotation` and `col_rotation` are typically 0,
/// and `pixel_height` is negative. For geographic rasters `x` is longitude
/// and `y` is latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Map fractional pixel-grid coordinates to geographic coordinates.
    ///
    /// `(0.0, 0.0)` is the upper-left corner of the upper-left pixel.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Coefficient-wise comparison with a relative tolerance.
    ///
    /// The tolerance is scaled by the pixel size so that transforms read
    /// back from files with float32 tags still compare equal.
    pub fn approx_eq(&self, other: &GeoTransform, rel_tol: f64) -> bool {
        let scale = self.pixel_width.abs().max(self.pixel_height.abs()).max(1e-12);
        let tol = rel_tol * scale;
        let pairs = [
            (self.origin_x, other.origin_x),
            (self.origin_y, other.origin_y),
            (self.pixel_width, other.pixel_width),
            (self.pixel_height, other.pixel_height),
            (self.row_rotation, other.row_rotation),
            (self.col_rotation, other.col_rotation),
        ];
        pairs.iter().all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
