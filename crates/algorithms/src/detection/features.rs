//! Cluster to loss feature: geometry, magnitudes and confidence

use clearcut_core::{DetectionConfig, GeoTransform, LossFeature, Raster, Severity};

use crate::clustering::PixelCluster;
use crate::imagery::{ChangeMap, IndexDeltas};
use crate::maybe_rayon::*;
use crate::scoring::{score, ClusterEvidence};
use crate::vector::{exposed_edges, extract_polygon};

/// Build one feature per cluster, preserving cluster order
pub(crate) fn build_features(
    clusters: Vec<PixelCluster>,
    change: &ChangeMap,
    deltas: &IndexDeltas,
    transform: &GeoTransform,
    config: &DetectionConfig,
) -> Vec<LossFeature> {
    let cols = change.mask.cols();
    clusters
        .into_par_iter()
        .map(|cluster| build_feature(&cluster, cols, change, deltas, transform, config))
        .collect()
}

fn build_feature(
    cluster: &PixelCluster,
    cols: usize,
    change: &ChangeMap,
    deltas: &IndexDeltas,
    transform: &GeoTransform,
    config: &DetectionConfig,
) -> LossFeature {
    let pixels = &cluster.pixels;
    let pixel_count = pixels.len();

    let full_agreement_pixels = pixels
        .iter()
        .filter(|&&i| change.full_agreement(i))
        .count();
    let evidence = ClusterEvidence {
        pixel_count,
        full_agreement_pixels,
        exposed_edges: exposed_edges(pixels, cols),
    };
    let scored = score(&evidence, &config.confidence);

    let mean_ndvi_loss = mean_valid(&deltas.ndvi_loss, pixels);

    LossFeature {
        polygon: extract_polygon(pixels, cols, transform, config.simplification_tolerance),
        area_ha: config.area_ha(pixel_count),
        confidence: scored.confidence,
        pixel_count,
        severity: Severity::from_ndvi_loss(mean_ndvi_loss),
        mean_ndvi_loss,
        mean_evi_loss: mean_valid(&deltas.evi_loss, pixels),
        mean_moisture_gain: mean_valid(&deltas.moisture_gain, pixels),
        full_agreement_fraction: scored.agreement,
        compactness: scored.compactness,
        first_pixel: cluster.first_pixel(),
    }
}

/// Mean over non-NaN cells at `pixels`; 0 when none are valid
fn mean_valid(grid: &Raster<f64>, pixels: &[usize]) -> f64 {
    let (sum, n) = pixels
        .iter()
        .filter_map(|&i| grid.at(i))
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
