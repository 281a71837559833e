//! Binary dilation
//!
//! A pixel is set after dilation when any offset of the structuring element
//! lands on a set pixel. Cells outside the raster count as unset.

use clearcut_core::{BinaryMask, Result};

use crate::maybe_rayon::*;

use super::element::StructuringElement;

/// Perform binary dilation on a mask
pub fn dilate(mask: &BinaryMask, element: &StructuringElement) -> Result<BinaryMask> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let offsets = element.offsets();

    let cells: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                *out = offsets.iter().any(|&(dr, dc)| {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    nr >= 0 && nc >= 0 && mask.get(nr as usize, nc as usize)
                });
            }
            row_data
        })
        .collect();

    Ok(BinaryMask::from_vec(cells, rows, cols)?.with_transform(*mask.transform()))
}
