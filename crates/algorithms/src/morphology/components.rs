//! Connected-component filtering of binary masks
//!
//! Foreground components use 8-connectivity and background components use
//! 4-connectivity, the usual complementary pair that keeps the two from
//! leaking through each other's diagonals.

use clearcut_core::raster::{offset_within, Neighborhood};
use clearcut_core::BinaryMask;

/// Connected components of cells equal to `value`, each a list of flat
/// indices in discovery order. Components are ordered by their first cell.
pub fn connected_components(
    mask: &BinaryMask,
    value: bool,
    neighborhood: Neighborhood,
) -> Vec<Vec<usize>> {
    let (rows, cols) = mask.shape();
    let offsets = neighborhood.offsets_no_center();
    let mut seen = vec![false; rows * cols];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in 0..rows * cols {
        if seen[start] || mask.get_index(start) != value {
            continue;
        }
        seen[start] = true;
        stack.push(start);
        let mut component = Vec::new();

        while let Some(idx) = stack.pop() {
            component.push(idx);
            let (row, col) = (idx / cols, idx % cols);
            for &(dr, dc) in &offsets {
                if let Some((nr, nc)) = offset_within(row, col, dr, dc, rows, cols) {
                    let nidx = nr * cols + nc;
                    if !seen[nidx] && mask.get_index(nidx) == value {
                        seen[nidx] = true;
                        stack.push(nidx);
                    }
                }
            }
        }
        components.push(component);
    }

    components
}

/// Clear 8-connected foreground components smaller than `min_pixels`
pub fn remove_small_components(mask: &BinaryMask, min_pixels: usize) -> BinaryMask {
    let mut out = mask.clone();
    if min_pixels <= 1 {
        return out;
    }
    for component in connected_components(mask, true, Neighborhood::Queen3x3) {
        if component.len() < min_pixels {
            for idx in component {
                out.set_index(idx, false);
            }
        }
    }
    out
}

/// Set enclosed background holes of at most `max_pixels`.
///
/// A hole is a 4-connected background component that does not touch the
/// raster border.
pub fn fill_holes(mask: &BinaryMask, max_pixels: usize) -> BinaryMask {
    let mut out = mask.clone();
    if max_pixels == 0 {
        return out;
    }
    let (rows, cols) = mask.shape();
    for component in connected_components(mask, false, Neighborhood::Rook3x3) {
        if component.len() > max_pixels {
            continue;
        }
        let touches_border = component.iter().any(|&idx| {
            let (r, c) = (idx / cols, idx % cols);
            r == 0 || c == 0 || r + 1 == rows || c + 1 == cols
        });
        if !touches_border {
            for idx in component {
                out.set_index(idx, true);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagonal_pixels_form_one_component() {
        let mask = BinaryMask::from_fn(4, 4, |r, c| r == c);
        let comps = connected_components(&mask, true, Neighborhood::Queen3x3);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].len(), 4);

        let rook = connected_components(&mask, true, Neighborhood::Rook3x3);
        assert_eq!(rook.len(), 4);
    }

    #[test]
    fn test_remove_small_components() {
        let mut mask = BinaryMask::from_fn(20, 20, |r, c| (2..6).contains(&r) && (2..6).contains(&c));
        mask.set(15, 15, true).unwrap();
        mask.set(15, 16, true).unwrap();

        let result = remove_small_components(&mask, 10);
        assert_eq!(result.count(), 16);
        assert!(!result.get(15, 15));
    }

    #[test]
    fn test_fill_enclosed_hole_only() {
        // 4x4 block with a 2x2 hole in the middle
        let mut mask = BinaryMask::from_fn(8, 8, |r, c| (1..5).contains(&r) && (1..5).contains(&c));
        for (r, c) in [(2, 2), (2, 3), (3, 2), (3, 3)] {
            mask.set(r, c, false).unwrap();
        }

        let filled = fill_holes(&mask, 16);
        assert_eq!(filled.count(), 16);

        let too_small_budget = fill_holes(&mask, 3);
        assert_eq!(too_small_budget.count(), 12);
    }

    #[test]
    fn test_border_background_is_not_a_hole() {
        let mask = BinaryMask::from_fn(5, 5, |r, _| r == 2);
        let filled = fill_holes(&mask, 100);
        assert_eq!(filled.count(), 5);
    }
}
