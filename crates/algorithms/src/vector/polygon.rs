//! Cluster to georeferenced polygon

use clearcut_core::GeoTransform;
use geo::orient::{Direction, Orient};
use geo::{ConvexHull, Coord, LineString, Polygon, Rect, Simplify};

use super::boundary::trace_outer_boundary;

/// Clusters at or below this many pixels get a bounding-box ring
pub const BOUNDING_BOX_MAX_PIXELS: usize = 2;

/// Convert a pixel cluster into a simplified, closed, georeferenced polygon.
///
/// `pixels` are sorted row-major flat indices on a grid `cols` wide.
/// `tolerance` is the Douglas-Peucker tolerance in pixel widths. The exterior
/// ring is counter-clockwise in map coordinates and always closed.
pub fn extract_polygon(
    pixels: &[usize],
    cols: usize,
    transform: &GeoTransform,
    tolerance: f64,
) -> Polygon<f64> {
    let grid_polygon = if pixels.len() <= BOUNDING_BOX_MAX_PIXELS {
        bounding_box(pixels, cols)
    } else {
        traced_polygon(pixels, cols, tolerance)
    };
    georeference(&grid_polygon, transform)
}

/// Footprint bounding box in pixel-grid coordinates
fn bounding_box(pixels: &[usize], cols: usize) -> Polygon<f64> {
    let (mut min_c, mut min_r) = (usize::MAX, usize::MAX);
    let (mut max_c, mut max_r) = (0usize, 0usize);
    for &idx in pixels {
        let (r, c) = (idx / cols, idx % cols);
        min_c = min_c.min(c);
        min_r = min_r.min(r);
        max_c = max_c.max(c);
        max_r = max_r.max(r);
    }
    if pixels.is_empty() {
        return Polygon::new(LineString::new(Vec::new()), Vec::new());
    }
    Rect::new(
        Coord { x: min_c as f64, y: min_r as f64 },
        Coord { x: (max_c + 1) as f64, y: (max_r + 1) as f64 },
    )
    .to_polygon()
}

fn traced_polygon(pixels: &[usize], cols: usize, tolerance: f64) -> Polygon<f64> {
    let vertices = trace_outer_boundary(pixels, cols);
    let mut ring: LineString<f64> = vertices.iter().map(|&[x, y]| (x, y)).collect();
    ring.close();

    let simplified = if tolerance > 0.0 {
        ring.simplify(&tolerance)
    } else {
        ring.clone()
    };

    // A closed ring repeats its first vertex
    if simplified.0.len() < 4 {
        return ring.convex_hull();
    }
    Polygon::new(simplified, Vec::new())
}

fn georeference(polygon: &Polygon<f64>, transform: &GeoTransform) -> Polygon<f64> {
    let exterior: LineString<f64> = polygon
        .exterior()
        .coords()
        .map(|c| transform.apply(c.x, c.y))
        .collect();
    Polygon::new(exterior, Vec::new()).orient(Direction::Default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::Area;

    fn unit_grid() -> GeoTransform {
        GeoTransform::new(0.0, 0.0, 1.0, 1.0)
    }

    fn block(rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, width: usize) -> Vec<usize> {
        let mut px = Vec::new();
        for r in rows {
            for c in cols.clone() {
                px.push(r * width + c);
            }
        }
        px
    }

    fn is_closed(p: &Polygon<f64>) -> bool {
        let coords = &p.exterior().0;
        coords.len() >= 4 && coords.first() == coords.last()
    }

    #[test]
    fn test_block_polygon_matches_footprint() {
        let px = block(2..7, 3..9, 20);
        let poly = extract_polygon(&px, 20, &unit_grid(), 0.5);
        assert!(is_closed(&poly));
        assert_eq!(poly.exterior().0.len(), 5);
        assert_relative_eq!(poly.unsigned_area(), 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_pixel_bounding_box() {
        let transform = GeoTransform::new(-60.0, -3.0, 0.001, -0.001);
        let poly = extract_polygon(&[5 * 10 + 4], 10, &transform, 0.5);
        assert!(is_closed(&poly));
        assert_eq!(poly.exterior().0.len(), 5);
        assert_relative_eq!(poly.unsigned_area(), 1e-6, max_relative = 1e-9);

        let xs: Vec<f64> = poly.exterior().coords().map(|c| c.x).collect();
        let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
        assert_relative_eq!(min_x, -60.0 + 4.0 * 0.001, epsilon = 1e-12);
    }

    #[test]
    fn test_two_diagonal_pixels_bounding_box() {
        let poly = extract_polygon(&[0, 11], 10, &unit_grid(), 0.5);
        assert_relative_eq!(poly.unsigned_area(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_exterior_is_counter_clockwise_after_north_up_flip() {
        let transform = GeoTransform::new(500000.0, 9000000.0, 10.0, -10.0);
        let px = block(0..4, 0..4, 10);
        let poly = extract_polygon(&px, 10, &transform, 0.5);
        assert!(poly.signed_area() > 0.0);
        assert_relative_eq!(poly.unsigned_area(), 1600.0, epsilon = 1e-6);
    }

    #[test]
    fn test_simplification_reduces_staircase() {
        // Diagonal staircase band, three pixels thick
        let width = 30;
        let mut px: Vec<usize> = (0..20)
            .flat_map(|r| (r..r + 3).map(move |c| r * width + c))
            .collect();
        px.sort_unstable();

        let exact = extract_polygon(&px, width, &unit_grid(), 0.0);
        let coarse = extract_polygon(&px, width, &unit_grid(), 1.5);
        assert!(is_closed(&coarse));
        assert!(
            coarse.exterior().0.len() < exact.exterior().0.len(),
            "Expected fewer vertices, got {} vs {}",
            coarse.exterior().0.len(),
            exact.exterior().0.len()
        );
    }
}
