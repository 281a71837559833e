//! Structuring element definitions for binary morphology
//!
//! A structuring element is the set of (dr, dc) offsets visited around each
//! pixel by erosion and dilation.

use clearcut_core::raster::Neighborhood;
use clearcut_core::{Error, Result};

/// Shape of a structuring element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuringElement {
    /// Square element of given radius (side = 2*radius + 1)
    Square(usize),
    /// Isotropic disk: every offset with `dr² + dc² <= radius²`
    Disk(usize),
}

impl Default for StructuringElement {
    fn default() -> Self {
        StructuringElement::Disk(1)
    }
}

impl StructuringElement {
    /// Reject zero radii
    pub fn validate(&self) -> Result<()> {
        if self.radius() == 0 {
            return Err(Error::InvalidParameter {
                name: "radius",
                value: "0".to_string(),
                reason: "structuring element radius must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn radius(&self) -> usize {
        match self {
            StructuringElement::Square(r) | StructuringElement::Disk(r) => *r,
        }
    }

    /// (dr, dc) offsets relative to the center, center included
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        match self {
            StructuringElement::Square(r) => Neighborhood::Square(*r).offsets(),
            StructuringElement::Disk(r) => Neighborhood::Circle(*r).offsets(),
        }
    }
}
