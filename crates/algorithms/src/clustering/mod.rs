//! Pixel clustering
//!
//! Changed pixels are merged into clusters with a disjoint-set forest.
//! Two linking rules are available:
//!
//! - **Raster adjacency** (default): 8-neighbours on the grid. One row-major
//!   scan links each pixel to its four already-visited neighbours, so every
//!   adjacent pair is considered exactly once.
//! - **Distance-bounded**: any two pixel centres within `max_link_distance`
//!   (in pixel widths) are linked, found through a k-d tree. Chains of links
//!   merge transitively, so two pixels can share a cluster without being
//!   within the distance of each other.

mod kdtree;
mod union_find;

pub use kdtree::KdTree;
pub use union_find::UnionFind;

use clearcut_core::raster::{offset_within, Neighborhood};
use clearcut_core::{BinaryMask, ClusterLinking, DetectionConfig, Error, Result};
use tracing::debug;

/// Parameters for pixel clustering
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub linking: ClusterLinking,
    /// Link radius in pixel widths (distance-bounded linking only)
    pub max_link_distance: f64,
    /// Clusters with fewer pixels are dropped
    pub min_cluster_pixels: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

impl From<&DetectionConfig> for ClusterParams {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            linking: config.linking,
            max_link_distance: config.max_link_distance,
            min_cluster_pixels: config.min_cluster_pixels,
        }
    }
}

/// A set of linked changed pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelCluster {
    /// Row-major flat indices, ascending
    pub pixels: Vec<usize>,
}

impl PixelCluster {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Smallest flat index in the cluster
    pub fn first_pixel(&self) -> usize {
        self.pixels.first().copied().unwrap_or(0)
    }

    /// (row, col) of every pixel on a grid `cols` wide
    pub fn coords(&self, cols: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pixels.iter().map(move |&i| (i / cols, i % cols))
    }
}

/// Cluster the set pixels of `mask`.
///
/// Clusters come out ordered by their first pixel; those smaller than
/// `min_cluster_pixels` are dropped.
pub fn cluster_pixels(mask: &BinaryMask, params: &ClusterParams) -> Result<Vec<PixelCluster>> {
    let clusters = match params.linking {
        ClusterLinking::RasterAdjacency => cluster_raster(mask),
        ClusterLinking::DistanceBounded => {
            if !(params.max_link_distance.is_finite() && params.max_link_distance > 0.0) {
                return Err(Error::InvalidParameter {
                    name: "max_link_distance",
                    value: params.max_link_distance.to_string(),
                    reason: "must be > 0".to_string(),
                });
            }
            let cols = mask.cols();
            let pixels: Vec<usize> = mask.iter_set().collect();
            let centres: Vec<[f64; 2]> = pixels
                .iter()
                .map(|&i| [(i % cols) as f64 + 0.5, (i / cols) as f64 + 0.5])
                .collect();
            cluster_points(&centres, params.max_link_distance)
                .into_iter()
                .map(|members| PixelCluster {
                    pixels: members.into_iter().map(|m| pixels[m]).collect(),
                })
                .collect()
        }
    };

    let total = clusters.len();
    let kept: Vec<PixelCluster> = clusters
        .into_iter()
        .filter(|c| c.len() >= params.min_cluster_pixels)
        .collect();

    debug!(
        linking = ?params.linking,
        clusters = total,
        kept = kept.len(),
        min_cluster_pixels = params.min_cluster_pixels,
        "clustered changed pixels"
    );
    Ok(kept)
}

/// 8-adjacency clustering over a W×H arena of flat indices
fn cluster_raster(mask: &BinaryMask) -> Vec<PixelCluster> {
    let (rows, cols) = mask.shape();
    let mut uf = UnionFind::new(rows * cols);

    for idx in mask.iter_set() {
        let (row, col) = (idx / cols, idx % cols);
        for &(dr, dc) in &Neighborhood::QUEEN_BACKWARD {
            if let Some((nr, nc)) = offset_within(row, col, dr, dc, rows, cols) {
                let nidx = nr * cols + nc;
                if mask.get_index(nidx) {
                    uf.union(idx, nidx);
                }
            }
        }
    }

    group_by_root(&mut uf, mask.iter_set())
        .into_iter()
        .map(|pixels| PixelCluster { pixels })
        .collect()
}

/// Group arbitrary points whose centres are within `max_distance`, transitively.
///
/// Returns clusters as lists of point indices, ascending, ordered by their
/// smallest member.
pub fn cluster_points(points: &[[f64; 2]], max_distance: f64) -> Vec<Vec<usize>> {
    let tree = KdTree::build(points);
    let mut uf = UnionFind::new(points.len());

    for (i, &p) in points.iter().enumerate() {
        for j in tree.within_radius(p, max_distance) {
            if j > i {
                uf.union(i, j);
            }
        }
    }

    group_by_root(&mut uf, 0..points.len())
}

/// Collect members by set representative, preserving first-seen order
fn group_by_root(uf: &mut UnionFind, members: impl Iterator<Item = usize>) -> Vec<Vec<usize>> {
    let mut slot_of_root = std::collections::HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for m in members {
        let root = uf.find(m);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(m);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(linking: ClusterLinking, min: usize) -> ClusterParams {
        ClusterParams {
            linking,
            max_link_distance: 1.5,
            min_cluster_pixels: min,
        }
    }

    fn two_blocks() -> BinaryMask {
        BinaryMask::from_fn(20, 20, |r, c| {
            ((2..6).contains(&r) && (2..6).contains(&c)) || ((10..13).contains(&r) && (10..15).contains(&c))
        })
    }

    #[test]
    fn test_raster_clusters_in_first_pixel_order() {
        let clusters = cluster_pixels(&two_blocks(), &params(ClusterLinking::RasterAdjacency, 1)).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 16);
        assert_eq!(clusters[0].first_pixel(), 2 * 20 + 2);
        assert_eq!(clusters[1].len(), 15);
    }

    #[test]
    fn test_diagonal_neighbours_join() {
        let mask = BinaryMask::from_fn(6, 6, |r, c| r == c || r + c == 5);
        let clusters = cluster_pixels(&mask, &params(ClusterLinking::RasterAdjacency, 1)).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 12);
    }

    #[test]
    fn test_small_clusters_dropped() {
        let mut mask = two_blocks();
        mask.set(18, 18, true).unwrap();
        let clusters = cluster_pixels(&mask, &params(ClusterLinking::RasterAdjacency, 10)).unwrap();
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| !c.pixels.contains(&(18 * 20 + 18))));
    }

    #[test]
    fn test_distance_mode_agrees_with_raster_at_default_radius() {
        let mask = two_blocks();
        let raster = cluster_pixels(&mask, &params(ClusterLinking::RasterAdjacency, 1)).unwrap();
        let distance = cluster_pixels(&mask, &params(ClusterLinking::DistanceBounded, 1)).unwrap();
        assert_eq!(raster, distance);
    }

    #[test]
    fn test_chain_links_transitively() {
        // Spacing 1.0 with radius 1.2: neighbours link, ends are 9 apart
        let points: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 0.0]).collect();
        let clusters = cluster_points(&points, 1.2);
        assert_eq!(clusters, vec![(0..10).collect::<Vec<_>>()]);

        let split = cluster_points(&points, 0.9);
        assert_eq!(split.len(), 10);
    }

    #[test]
    fn test_rejects_bad_link_distance() {
        let mut p = params(ClusterLinking::DistanceBounded, 1);
        p.max_link_distance = 0.0;
        assert!(cluster_pixels(&two_blocks(), &p).is_err());
    }
}
