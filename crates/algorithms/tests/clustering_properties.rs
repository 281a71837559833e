//! Union-Find clustering properties

use clearcut_algorithms::clustering::{cluster_pixels, cluster_points, ClusterParams};
use clearcut_core::{BinaryMask, ClusterLinking};

#[test]
fn chained_points_share_one_cluster() {
    // Zig-zag chain: consecutive points 1.0 apart, every other pair 1.6 apart
    let points: Vec<[f64; 2]> = (0..25)
        .map(|i| [i as f64 * 0.8, if i % 2 == 0 { 0.0 } else { 0.6 }])
        .collect();
    let max_distance = 1.05;

    let first = points[0];
    let last = points[points.len() - 1];
    let span = ((first[0] - last[0]).powi(2) + (first[1] - last[1]).powi(2)).sqrt();
    assert!(span > 10.0 * max_distance);

    let clusters = cluster_points(&points, max_distance);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].len(), points.len());
}

#[test]
fn distance_linking_bridges_gaps_raster_linking_does_not() {
    // Pixels two columns apart along a row: never 8-adjacent
    let mask = BinaryMask::from_fn(5, 40, |r, c| r == 2 && c % 2 == 0);

    let raster = cluster_pixels(
        &mask,
        &ClusterParams {
            linking: ClusterLinking::RasterAdjacency,
            max_link_distance: 1.5,
            min_cluster_pixels: 1,
        },
    )
    .unwrap();
    assert_eq!(raster.len(), 20);

    let distance = cluster_pixels(
        &mask,
        &ClusterParams {
            linking: ClusterLinking::DistanceBounded,
            max_link_distance: 2.0,
            min_cluster_pixels: 1,
        },
    )
    .unwrap();
    assert_eq!(distance.len(), 1);
    assert_eq!(distance[0].len(), 20);
}

#[test]
fn small_clusters_are_dropped_after_merging() {
    // Nine isolated pixels merge into one cluster of 9 under a wide radius
    let mask = BinaryMask::from_fn(9, 9, |r, c| r % 4 == 0 && c % 4 == 0);
    let params = |min| ClusterParams {
        linking: ClusterLinking::DistanceBounded,
        max_link_distance: 4.0,
        min_cluster_pixels: min,
    };

    assert_eq!(cluster_pixels(&mask, &params(9)).unwrap().len(), 1);
    assert!(cluster_pixels(&mask, &params(10)).unwrap().is_empty());
}

#[test]
fn clusters_partition_the_mask() {
    let mask = BinaryMask::from_fn(50, 50, |r, c| (r * 7 + c * 3) % 11 < 4);
    let clusters = cluster_pixels(
        &mask,
        &ClusterParams {
            linking: ClusterLinking::RasterAdjacency,
            max_link_distance: 1.5,
            min_cluster_pixels: 1,
        },
    )
    .unwrap();

    let mut seen: Vec<usize> = clusters.iter().flat_map(|c| c.pixels.iter().copied()).collect();
    seen.sort_unstable();
    let expected: Vec<usize> = mask.iter_set().collect();
    assert_eq!(seen, expected);

    let firsts: Vec<usize> = clusters.iter().map(|c| c.first_pixel()).collect();
    assert!(firsts.windows(2).all(|w| w[0] < w[1]));
}
