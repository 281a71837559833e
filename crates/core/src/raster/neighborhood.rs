//! Neighborhood patterns for raster analysis

/// Defines a neighborhood pattern around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// 3x3 neighborhood (8 neighbors + center)
    Queen3x3,
    /// 3x3 without corners (4 neighbors + center)
    Rook3x3,
    /// Custom square neighborhood of given radius
    Square(usize),
    /// Circular neighborhood of given radius (in cells)
    Circle(usize),
}

impl Neighborhood {
    /// Get the radius of the neighborhood
    pub fn radius(&self) -> usize {
        match self {
            Neighborhood::Queen3x3 | Neighborhood::Rook3x3 => 1,
            Neighborhood::Square(r) | Neighborhood::Circle(r) => *r,
        }
    }

    /// Check if a relative position is within this neighborhood
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        match self {
            Neighborhood::Queen3x3 => dr.abs() <= 1 && dc.abs() <= 1,
            Neighborhood::Rook3x3 => dr.abs() + dc.abs() <= 1,
            Neighborhood::Square(r) => {
                let r = *r as isize;
                dr.abs() <= r && dc.abs() <= r
            }
            Neighborhood::Circle(r) => {
                let r = *r as isize;
                dr * dr + dc * dc <= r * r
            }
        }
    }

    /// Relative positions in this neighborhood, row-major
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius() as isize;
        let mut offsets = Vec::new();

        for dr in -r..=r {
            for dc in -r..=r {
                if self.contains(dr, dc) {
                    offsets.push((dr, dc));
                }
            }
        }

        offsets
    }

    /// Get offsets excluding the center cell
    pub fn offsets_no_center(&self) -> Vec<(isize, isize)> {
        self.offsets()
            .into_iter()
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .collect()
    }

    /// Neighbors already visited in a row-major scan (up-left, up, up-right, left)
    ///
    /// Linking each cell only to these visits every 8-adjacent pair exactly once.
    pub const QUEEN_BACKWARD: [(isize, isize); 4] = [(-1, -1), (-1, 0), (-1, 1), (0, -1)];
}

/// Offset `(row, col)` by `(dr, dc)`, returning `None` outside a `rows x cols` grid.
#[inline]
pub fn offset_within(
    row: usize,
    col: usize,
    dr: isize,
    dc: isize,
    rows: usize,
    cols: usize,
) -> Option<(usize, usize)> {
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        None
    } else {
        Some((nr as usize, nc as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighborhood_offsets() {
        assert_eq!(Neighborhood::Queen3x3.offsets().len(), 9);
        assert_eq!(Neighborhood::Rook3x3.offsets().len(), 5);
        assert_eq!(Neighborhood::Square(2).offsets().len(), 25);
        assert_eq!(Neighborhood::Queen3x3.offsets_no_center().len(), 8);
    }

    #[test]
    fn test_circle_is_isotropic() {
        // Radius 2: 5x5 minus the corners and the eight knight-move cells
        let offsets = Neighborhood::Circle(2).offsets();
        assert_eq!(offsets.len(), 13);
        assert!(offsets.contains(&(2, 0)));
        assert!(offsets.contains(&(1, 1)));
        assert!(!offsets.contains(&(2, 1)));
        assert!(!offsets.contains(&(2, 2)));
    }

    #[test]
    fn test_offset_within() {
        assert_eq!(offset_within(0, 0, -1, 0, 3, 3), None);
        assert_eq!(offset_within(1, 1, 1, 1, 3, 3), Some((2, 2)));
        assert_eq!(offset_within(2, 2, 0, 1, 3, 3), None);
    }
}
