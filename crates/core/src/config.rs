//! Detection configuration
//!
//! A [`DetectionConfig`] is passed explicitly into every detection call;
//! nothing in the pipeline reads global defaults. All fields deserialize
//! with `#[serde(default)]`, so a JSON file only needs the values it changes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How changed pixels are linked into clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLinking {
    /// Raster 8-adjacency (exact, linear time)
    #[default]
    RasterAdjacency,
    /// Any two pixel centres within `max_link_distance` pixel widths
    DistanceBounded,
}

/// Adaptive (Otsu) threshold tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    /// Histogram bins spanning the valid delta range
    pub histogram_bins: usize,
    /// Fewer valid deltas than this and the index abstains
    pub min_valid_samples: usize,
    /// Minimum gap between the Otsu class means, in pooled within-class
    /// standard deviations
    pub min_class_separation: f64,
    /// The upper (change) class must hold at least this many deltas
    pub min_change_samples: usize,
    /// How many times a non-separating split is retried on its upper class
    pub max_split_depth: usize,
    /// Floor for every adaptive threshold
    pub min_change_delta: f64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            histogram_bins: 256,
            min_valid_samples: 32,
            min_class_separation: 4.0,
            min_change_samples: 4,
            max_split_depth: 4,
            min_change_delta: 0.05,
        }
    }
}

/// Weights of the confidence heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceParams {
    /// Cluster size at which the size term is ~95% saturated
    pub size_saturation_pixels: usize,
    pub size_weight: f64,
    pub agreement_weight: f64,
    pub compactness_weight: f64,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            size_saturation_pixels: 100,
            size_weight: 0.3,
            agreement_weight: 0.4,
            compactness_weight: 0.3,
        }
    }
}

/// Tuning values for one detection invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Baseline forest: NDVI above this
    pub ndvi_forest_threshold: f64,
    /// Baseline forest: EVI above this
    pub evi_forest_threshold: f64,
    /// Baseline forest: moisture index below this
    pub moisture_forest_threshold: f64,
    /// Clusters smaller than this are dropped after merging
    pub min_cluster_pixels: usize,
    /// Link radius for distance-bounded clustering, in pixel widths
    pub max_link_distance: f64,
    /// Douglas-Peucker tolerance, in pixel widths
    pub simplification_tolerance: f64,
    /// Ground area of one pixel in square metres
    pub pixel_area_m2: f64,
    /// Connected components below this size are removed before closing
    pub min_patch_pixels: usize,
    /// Radius of the disk structuring element
    pub morphology_radius: usize,
    /// Enclosed holes up to this size are filled after closing (0 disables)
    pub max_hole_pixels: usize,
    pub linking: ClusterLinking,
    /// Band values at or above this are treated as saturated
    pub saturation_reflectance: f64,
    pub threshold: ThresholdParams,
    pub confidence: ConfidenceParams,
    /// Features at or above this confidence are reported as alerts
    pub alert_confidence: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ndvi_forest_threshold: 0.4,
            evi_forest_threshold: 0.25,
            moisture_forest_threshold: 0.3,
            min_cluster_pixels: 10,
            max_link_distance: 1.5,
            simplification_tolerance: 0.5,
            pixel_area_m2: 100.0,
            min_patch_pixels: 10,
            morphology_radius: 1,
            max_hole_pixels: 16,
            linking: ClusterLinking::RasterAdjacency,
            saturation_reflectance: 1.0,
            threshold: ThresholdParams::default(),
            confidence: ConfidenceParams::default(),
            alert_confidence: 0.7,
        }
    }
}

impl DetectionConfig {
    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("ndvi_forest_threshold", self.ndvi_forest_threshold),
            ("evi_forest_threshold", self.evi_forest_threshold),
            ("moisture_forest_threshold", self.moisture_forest_threshold),
        ] {
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(invalid(name, value, "must be a finite index value in [-1, 1]"));
            }
        }

        if self.min_cluster_pixels == 0 {
            return Err(invalid("min_cluster_pixels", 0, "must be at least 1"));
        }
        if !(self.max_link_distance.is_finite() && self.max_link_distance > 0.0) {
            return Err(invalid("max_link_distance", self.max_link_distance, "must be > 0"));
        }
        if !(self.simplification_tolerance.is_finite() && self.simplification_tolerance >= 0.0) {
            return Err(invalid(
                "simplification_tolerance",
                self.simplification_tolerance,
                "must be >= 0",
            ));
        }
        if !(self.pixel_area_m2.is_finite() && self.pixel_area_m2 > 0.0) {
            return Err(invalid("pixel_area_m2", self.pixel_area_m2, "must be > 0"));
        }
        if self.morphology_radius == 0 {
            return Err(invalid("morphology_radius", 0, "disk radius must be at least 1"));
        }
        if !(self.saturation_reflectance.is_finite() && self.saturation_reflectance > 0.0) {
            return Err(invalid(
                "saturation_reflectance",
                self.saturation_reflectance,
                "must be > 0",
            ));
        }

        let t = &self.threshold;
        if t.histogram_bins < 2 {
            return Err(invalid("threshold.histogram_bins", t.histogram_bins, "need at least 2 bins"));
        }
        if !(t.min_class_separation.is_finite() && t.min_class_separation > 0.0) {
            return Err(invalid(
                "threshold.min_class_separation",
                t.min_class_separation,
                "must be > 0",
            ));
        }
        if t.min_change_samples == 0 {
            return Err(invalid("threshold.min_change_samples", 0, "must be at least 1"));
        }
        if t.max_split_depth == 0 {
            return Err(invalid("threshold.max_split_depth", 0, "must be at least 1"));
        }
        if !(t.min_change_delta.is_finite() && t.min_change_delta >= 0.0) {
            return Err(invalid("threshold.min_change_delta", t.min_change_delta, "must be >= 0"));
        }

        let c = &self.confidence;
        if c.size_saturation_pixels == 0 {
            return Err(invalid("confidence.size_saturation_pixels", 0, "must be at least 1"));
        }
        let weights = [c.size_weight, c.agreement_weight, c.compactness_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(invalid(
                "confidence weights",
                format!("{:?}", weights),
                "must be non-negative with a positive sum",
            ));
        }
        if !(0.0..=1.0).contains(&self.alert_confidence) {
            return Err(invalid("alert_confidence", self.alert_confidence, "must be in [0, 1]"));
        }

        Ok(())
    }

    /// Hectares covered by `pixel_count` pixels
    pub fn area_ha(&self, pixel_count: usize) -> f64 {
        pixel_count as f64 * self.pixel_area_m2 / 10_000.0
    }
}

fn invalid(name: &'static str, value: impl ToString, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        DetectionConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut cfg = DetectionConfig::default();
        cfg.pixel_area_m2 = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidParameter { name: "pixel_area_m2", .. })
        ));

        let mut cfg = DetectionConfig::default();
        cfg.ndvi_forest_threshold = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = DetectionConfig::default();
        cfg.confidence.size_weight = 0.0;
        cfg.confidence.agreement_weight = 0.0;
        cfg.confidence.compactness_weight = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = DetectionConfig::default();
        cfg.threshold.min_class_separation = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidParameter { name: "threshold.min_class_separation", .. })
        ));

        let mut cfg = DetectionConfig::default();
        cfg.threshold.max_split_depth = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: DetectionConfig =
            serde_json::from_str(r#"{"min_cluster_pixels": 25, "linking": "distance_bounded"}"#)
                .unwrap();
        assert_eq!(cfg.min_cluster_pixels, 25);
        assert_eq!(cfg.linking, ClusterLinking::DistanceBounded);
        assert_eq!(cfg.pixel_area_m2, 100.0);
        assert_eq!(cfg.threshold.histogram_bins, 256);
    }

    #[test]
    fn test_area_ha() {
        let cfg = DetectionConfig::default();
        assert_eq!(cfg.area_ha(50), 0.5);
    }
}
