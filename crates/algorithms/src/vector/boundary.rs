//! Outer-boundary tracing along pixel edges
//!
//! A pixel `(col, row)` occupies the square between corners `(col, row)` and
//! `(col + 1, row + 1)`. Every pixel edge facing a pixel outside the region
//! becomes a directed edge, oriented so the region lies on its right in
//! raster (y-down) coordinates:
//!
//! ```text
//! top    (c, r)     -> (c+1, r)
//! right  (c+1, r)   -> (c+1, r+1)
//! bottom (c+1, r+1) -> (c, r+1)
//! left   (c, r+1)   -> (c, r)
//! ```
//!
//! Walking the edges head to tail yields closed rings. Where two pixels
//! touch only at a corner, that vertex has two outgoing edges; the walk
//! turns left there, which crosses to the diagonal pixel and keeps an
//! 8-connected region on a single ring.

use std::collections::HashMap;

type Vertex = (i64, i64);
type Heading = (i64, i64);

/// Region described by sorted row-major flat indices on a grid `cols` wide
struct Region<'a> {
    pixels: &'a [usize],
    cols: usize,
}

impl Region<'_> {
    fn contains(&self, col: i64, row: i64) -> bool {
        if col < 0 || row < 0 || col >= self.cols as i64 {
            return false;
        }
        let idx = row as usize * self.cols + col as usize;
        self.pixels.binary_search(&idx).is_ok()
    }
}

/// Number of pixel edges shared with a pixel outside the region.
///
/// `pixels` must be sorted ascending.
pub fn exposed_edges(pixels: &[usize], cols: usize) -> usize {
    let region = Region { pixels, cols };
    pixels
        .iter()
        .map(|&idx| {
            let (c, r) = ((idx % cols) as i64, (idx / cols) as i64);
            [(0, -1), (1, 0), (0, 1), (-1, 0)]
                .iter()
                .filter(|&&(dc, dr)| !region.contains(c + dc, r + dr))
                .count()
        })
        .sum()
}

/// Trace the outer boundary of an 8-connected pixel region.
///
/// `pixels` must be sorted ascending and non-empty. Returns the corner
/// vertices of the ring in pixel-grid coordinates `(col, row)`, clockwise on
/// screen, without repeating the first vertex and with collinear runs merged.
pub fn trace_outer_boundary(pixels: &[usize], cols: usize) -> Vec<[f64; 2]> {
    let Some(&first) = pixels.first() else {
        return Vec::new();
    };
    let region = Region { pixels, cols };

    let mut outgoing: HashMap<Vertex, Vec<Heading>> = HashMap::new();
    let mut edge_count = 0usize;
    for &idx in pixels {
        let (c, r) = ((idx % cols) as i64, (idx / cols) as i64);
        let sides = [
            ((c, r - 1), (c, r), (1, 0)),
            ((c + 1, r), (c + 1, r), (0, 1)),
            ((c, r + 1), (c + 1, r + 1), (-1, 0)),
            ((c - 1, r), (c, r + 1), (0, -1)),
        ];
        for ((nc, nr), start, heading) in sides {
            if !region.contains(nc, nr) {
                outgoing.entry(start).or_default().push(heading);
                edge_count += 1;
            }
        }
    }

    // Top edge of the first pixel in row-major order is always on the outer ring
    let start: Vertex = ((first % cols) as i64, (first / cols) as i64);
    let start_heading: Heading = (1, 0);

    let mut vertices = Vec::new();
    let mut vertex = start;
    let mut heading = start_heading;
    for _ in 0..edge_count {
        vertices.push((vertex, heading));
        let next = (vertex.0 + heading.0, vertex.1 + heading.1);
        let Some(candidates) = outgoing.get(&next) else {
            break;
        };
        let left = (heading.1, -heading.0);
        let right = (-heading.1, heading.0);
        let Some(&turn) = [left, heading, right]
            .iter()
            .find(|h| candidates.contains(h))
        else {
            break;
        };
        if next == start && turn == start_heading {
            break;
        }
        vertex = next;
        heading = turn;
    }

    merge_collinear(&vertices)
}

/// Keep only vertices where the heading changes
fn merge_collinear(walk: &[(Vertex, Heading)]) -> Vec<[f64; 2]> {
    let n = walk.len();
    (0..n)
        .filter(|&i| {
            let incoming = walk[(i + n - 1) % n].1;
            incoming != walk[i].1
        })
        .map(|i| [walk[i].0 .0 as f64, walk[i].0 .1 as f64])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, width: usize) -> Vec<usize> {
        let mut px = Vec::new();
        for r in rows {
            for c in cols.clone() {
                px.push(r * width + c);
            }
        }
        px
    }

    #[test]
    fn test_square_block_has_four_corners() {
        let px = block(2..5, 3..7, 10);
        let ring = trace_outer_boundary(&px, 10);
        assert_eq!(ring, vec![[3.0, 2.0], [7.0, 2.0], [7.0, 5.0], [3.0, 5.0]]);
    }

    #[test]
    fn test_l_shape_has_six_corners() {
        // ##
        // #.
        let px = vec![0, 1, 10];
        let ring = trace_outer_boundary(&px, 10);
        assert_eq!(ring.len(), 6);
        assert_eq!(ring[0], [0.0, 0.0]);
        assert!(ring.contains(&[1.0, 1.0]));
    }

    #[test]
    fn test_diagonal_pixels_share_one_ring() {
        // #.
        // .#
        let px = vec![0, 11];
        let ring = trace_outer_boundary(&px, 10);
        // Both squares (4 corners each), the shared corner visited twice
        assert_eq!(ring.len(), 8);
        assert_eq!(ring.iter().filter(|v| **v == [1.0, 1.0]).count(), 2);
        assert!(ring.contains(&[2.0, 2.0]));
    }

    #[test]
    fn test_hole_is_not_traced() {
        let mut px = block(0..5, 0..5, 5);
        px.retain(|&i| i != 12);
        let ring = trace_outer_boundary(&px, 5);
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_exposed_edges() {
        assert_eq!(exposed_edges(&[0], 10), 4);
        assert_eq!(exposed_edges(&block(0..2, 0..2, 10), 10), 8);
        assert_eq!(exposed_edges(&block(0..20, 0..20, 20), 20), 80);
    }
}
