//! 2D k-d tree for fixed-radius neighbour queries
//!
//! Used by distance-bounded clustering, where pixels are not guaranteed to
//! sit on one regular grid. Construction is O(n log n) with median splits;
//! a radius query visits only the subtrees whose splitting plane lies within
//! the radius.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

/// A 2D k-d tree over `(x, y)` points, answering queries with point indices
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<[f64; 2]>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split dimension: 0 = x, 1 = y
    split_dim: usize,
    left: Option<usize>,
    right: Option<usize>,
}

impl KdTree {
    /// Build a tree over `points`. Query results refer to positions in this slice.
    pub fn build(points: &[[f64; 2]]) -> Self {
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(points, &mut indices, 0, &mut nodes);
        }
        Self {
            nodes,
            points: points.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Indices of all points within `radius` (inclusive) of `query`, ascending
    pub fn within_radius(&self, query: [f64; 2], radius: f64) -> Vec<usize> {
        let mut results = Vec::new();
        if self.nodes.is_empty() || radius.is_nan() || radius < 0.0 {
            return results;
        }
        self.radius_recursive(0, query, radius * radius, &mut results);
        results.sort_unstable();
        results
    }

    fn radius_recursive(&self, node_idx: usize, q: [f64; 2], radius_sq: f64, out: &mut Vec<usize>) {
        let node = &self.nodes[node_idx];
        let p = self.points[node.point_idx];

        let dx = q[0] - p[0];
        let dy = q[1] - p[1];
        if dx * dx + dy * dy <= radius_sq {
            out.push(node.point_idx);
        }

        let diff = q[node.split_dim] - p[node.split_dim];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = near {
            self.radius_recursive(child, q, radius_sq, out);
        }
        if diff * diff <= radius_sq {
            if let Some(child) = far {
                self.radius_recursive(child, q, radius_sq, out);
            }
        }
    }
}

/// Recursively build the tree; returns the index of the subtree root.
///
/// Each level only partitions around its median, so the build is O(n log n).
fn build_recursive(
    points: &[[f64; 2]],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let split_dim = depth % 2;
    let median = indices.len() / 2;
    indices.select_nth_unstable_by(median, |&a, &b| {
        points[a][split_dim].total_cmp(&points[b][split_dim])
    });

    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (left, rest) = indices.split_at_mut(median);
    let right = &mut rest[1..];

    if !left.is_empty() {
        let child = build_recursive(points, left, depth + 1, nodes);
        nodes[node_idx].left = Some(child);
    }
    if !right.is_empty() {
        let child = build_recursive(points, right, depth + 1, nodes);
        nodes[node_idx].right = Some(child);
    }

    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(points: &[[f64; 2]], q: [f64; 2], r: f64) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) <= r * r)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_matches_brute_force() {
        // Deterministic scatter
        let points: Vec<[f64; 2]> = (0..400)
            .map(|i| {
                let x = ((i * 37) % 101) as f64 * 0.5;
                let y = ((i * 53) % 89) as f64 * 0.5;
                [x, y]
            })
            .collect();
        let tree = KdTree::build(&points);
        assert_eq!(tree.len(), 400);

        for &q in &[[10.0, 10.0], [0.0, 0.0], [25.3, 40.1], [50.0, 44.0]] {
            for &r in &[0.5, 1.5, 3.0, 10.0] {
                assert_eq!(
                    tree.within_radius(q, r),
                    brute_force(&points, q, r),
                    "query {:?} radius {}",
                    q,
                    r
                );
            }
        }
    }

    #[test]
    fn test_pixel_grid_with_shared_coordinates() {
        // Pixel centres: every row and column value repeats
        let points: Vec<[f64; 2]> = (0..30)
            .flat_map(|r| (0..25).map(move |c| [c as f64 * 10.0 + 5.0, r as f64 * -10.0 - 5.0]))
            .collect();
        let tree = KdTree::build(&points);

        for &q in &[[5.0, -5.0], [125.0, -155.0], [130.0, -150.0], [245.0, -295.0]] {
            for &r in &[10.0, 14.2, 25.0] {
                assert_eq!(tree.within_radius(q, r), brute_force(&points, q, r));
            }
        }
    }

    #[test]
    fn test_radius_is_inclusive() {
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        let tree = KdTree::build(&points);
        assert_eq!(tree.within_radius([0.0, 0.0], 1.0), vec![0, 1]);
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.within_radius([0.0, 0.0], 5.0).is_empty());
    }
}
