//! Binary erosion
//!
//! A pixel survives erosion when every in-bounds offset of the structuring
//! element lands on a set pixel. Offsets falling outside the raster are
//! ignored, so regions touching the border are not eaten from that side.

use clearcut_core::{BinaryMask, Result};

use crate::maybe_rayon::*;

use super::element::StructuringElement;

/// Perform binary erosion on a mask
pub fn erode(mask: &BinaryMask, element: &StructuringElement) -> Result<BinaryMask> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let offsets = element.offsets();

    let cells: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if !mask.get(row, col) {
                    continue;
                }
                *out = offsets.iter().all(|&(dr, dc)| {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        return true;
                    }
                    mask.get(nr as usize, nc as usize)
                });
            }
            row_data
        })
        .collect();

    Ok(BinaryMask::from_vec(cells, rows, cols)?.with_transform(*mask.transform()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erode_square_with_disk() {
        let mask = BinaryMask::from_fn(9, 9, |r, c| (2..7).contains(&r) && (2..7).contains(&c));
        let result = erode(&mask, &StructuringElement::Disk(1)).unwrap();
        assert_eq!(result.count(), 9, "5x5 block erodes to its 3x3 core");
        assert!(result.get(4, 4));
        assert!(!result.get(2, 2));
    }

    #[test]
    fn test_erode_removes_single_pixel() {
        let mut mask = BinaryMask::new(5, 5);
        mask.set(2, 2, true).unwrap();
        let result = erode(&mask, &StructuringElement::Disk(1)).unwrap();
        assert!(result.none());
    }

    #[test]
    fn test_border_is_not_eroded() {
        let mask = BinaryMask::from_fn(4, 4, |_, _| true);
        let result = erode(&mask, &StructuringElement::Disk(1)).unwrap();
        assert_eq!(result.count(), 16);
    }
}
