//! Binary opening (erosion followed by dilation)
//!
//! Removes spurs and bridges thinner than the structuring element while
//! keeping the bulk of larger regions.

use clearcut_core::{BinaryMask, Result};

use super::dilate::dilate;
use super::element::StructuringElement;
use super::erode::erode;

/// Perform binary opening on a mask
pub fn opening(mask: &BinaryMask, element: &StructuringElement) -> Result<BinaryMask> {
    let eroded = erode(mask, element)?;
    dilate(&eroded, element)
}
