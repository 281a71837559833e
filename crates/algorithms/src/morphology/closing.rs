//! Binary closing (dilation followed by erosion)
//!
//! Bridges gaps narrower than the structuring element between fragments of
//! the same region.

use clearcut_core::{BinaryMask, Result};

use super::dilate::dilate;
use super::element::StructuringElement;
use super::erode::erode;

/// Perform binary closing on a mask
pub fn closing(mask: &BinaryMask, element: &StructuringElement) -> Result<BinaryMask> {
    let dilated = dilate(mask, element)?;
    erode(&dilated, element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closing_bridges_one_pixel_gap() {
        // Two 3x4 blocks separated by a one-column gap
        let mask = BinaryMask::from_fn(7, 11, |r, c| {
            (2..5).contains(&r) && c != 5 && (1..10).contains(&c)
        });
        assert!(!mask.get(3, 5));

        let result = closing(&mask, &StructuringElement::Disk(1)).unwrap();
        assert!(result.get(3, 5), "Gap should be bridged");
        // The disk cannot reach the outer rows of the gap
        assert!(!result.get(2, 5));
    }

    #[test]
    fn test_closing_keeps_solid_block() {
        let mask = BinaryMask::from_fn(10, 10, |r, c| (3..7).contains(&r) && (3..7).contains(&c));
        let result = closing(&mask, &StructuringElement::Disk(1)).unwrap();
        assert_eq!(result, mask);
    }
}
