//! End-to-end forest-loss detection
//!
//! A [`DetectionMethod`] picks how the change mask is voted; everything after
//! that (refinement, clustering, geometry, scoring) is shared:
//!
//! ```text
//! before ─┐                         ┌─ forest ─┐
//!         ├─ indices (6 grids) ─────┤          ├─ change map ─ refine ─ cluster ─ features
//! after  ─┘                         └─ deltas ─┘
//! ```
//!
//! Each call is a pure function of its inputs. No state survives between
//! invocations.

mod features;

use std::fmt;
use std::str::FromStr;

use clearcut_core::{
    Algorithm, Band, DetectionConfig, DetectionResult, Error, ImageEpoch, Result,
};
use tracing::{debug, info, warn};

use crate::clustering::{cluster_pixels, ClusterParams};
use crate::imagery::{
    classify_forest, compute_deltas, compute_epoch_pair, detect_change, detect_ndvi_change,
    ndvi_forest, BaselineParams, ChangeMap, IndexParams,
};
use crate::morphology::{refine_mask, RefineParams};

use self::features::build_features;

/// Default NDVI drop for the single-index strategy
pub const DEFAULT_NDVI_LOSS_THRESHOLD: f64 = 0.05;
/// Default before-NDVI above which the single-index strategy treats a pixel as forest
pub const DEFAULT_NDVI_FOREST: f64 = 0.2;

/// Detection strategy
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DetectionMethod {
    /// Three-index baseline, adaptive thresholds and a two-of-three vote
    #[default]
    Consensus,
    /// NDVI drop of at least `loss_threshold` on pixels with before-NDVI
    /// above `forest_ndvi`
    NdviDifference { loss_threshold: f64, forest_ndvi: f64 },
}

impl DetectionMethod {
    /// Single-index strategy with its default thresholds
    pub fn ndvi_difference() -> Self {
        DetectionMethod::NdviDifference {
            loss_threshold: DEFAULT_NDVI_LOSS_THRESHOLD,
            forest_ndvi: DEFAULT_NDVI_FOREST,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectionMethod::Consensus => "consensus",
            DetectionMethod::NdviDifference { .. } => "ndvi",
        }
    }

    /// Detect forest loss between two epochs.
    ///
    /// Fails with `MissingBand` or `MisalignedEpochs` on malformed input and
    /// with `InvalidParameter` on an unusable configuration. Weak signal is
    /// not an error: it comes back as an empty result flagged `LowSignal`.
    pub fn detect(
        &self,
        before: &ImageEpoch,
        after: &ImageEpoch,
        config: &DetectionConfig,
    ) -> Result<DetectionResult> {
        config.validate()?;
        self.validate()?;
        before.require(&Band::REQUIRED)?;
        after.require(&Band::REQUIRED)?;
        ImageEpoch::ensure_aligned(before, after)?;

        debug!(
            method = self.name(),
            rows = before.rows(),
            cols = before.cols(),
            before = before.name(),
            after = after.name(),
            "starting detection"
        );

        let (before_idx, after_idx) =
            compute_epoch_pair(before, after, &IndexParams::from(config))?;

        let (change, deltas) = match *self {
            DetectionMethod::Consensus => {
                let forest = classify_forest(&before_idx, &BaselineParams::from(config))?;
                let deltas = compute_deltas(&before_idx, &after_idx, &forest)?;
                let change = detect_change(&deltas, &forest, &config.threshold)?;
                (change, deltas)
            }
            DetectionMethod::NdviDifference {
                loss_threshold,
                forest_ndvi,
            } => {
                let forest = ndvi_forest(&before_idx, forest_ndvi)?;
                debug!(forest_pixels = forest.count(), "single-index forest mask");
                let deltas = compute_deltas(&before_idx, &after_idx, &forest)?;
                let change = detect_ndvi_change(&deltas, &forest, loss_threshold)?;
                (change, deltas)
            }
        };

        if !change.flags.is_empty() {
            warn!(flags = ?change.flags, "detection inconclusive");
            return Ok(DetectionResult::empty(change.flags, change.diagnostics));
        }

        let refined = refine_mask(&change.mask, &RefineParams::from(config))?;
        let clusters = cluster_pixels(&refined, &ClusterParams::from(config))?;

        let refined_change = ChangeMap {
            mask: refined,
            ..change
        };
        let features = build_features(
            clusters,
            &refined_change,
            &deltas,
            before.transform(),
            config,
        );

        let result = DetectionResult::new(
            features,
            refined_change.flags,
            refined_change.diagnostics,
            refined_change.mask.count(),
        );
        info!(
            method = self.name(),
            features = result.feature_count,
            total_area_ha = result.total_area_ha,
            changed_pixels = result.changed_pixels,
            status = ?result.status(),
            "detection complete"
        );
        Ok(result)
    }

    fn validate(&self) -> Result<()> {
        if let DetectionMethod::NdviDifference {
            loss_threshold,
            forest_ndvi,
        } = *self
        {
            if !(loss_threshold.is_finite() && loss_threshold > 0.0) {
                return Err(Error::InvalidParameter {
                    name: "loss_threshold",
                    value: loss_threshold.to_string(),
                    reason: "must be > 0".to_string(),
                });
            }
            if !(forest_ndvi.is_finite() && (-1.0..=1.0).contains(&forest_ndvi)) {
                return Err(Error::InvalidParameter {
                    name: "forest_ndvi",
                    value: forest_ndvi.to_string(),
                    reason: "must be an NDVI value in [-1, 1]".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "consensus" => Ok(DetectionMethod::Consensus),
            "ndvi" | "ndvi-difference" | "ndvi_difference" => Ok(DetectionMethod::ndvi_difference()),
            other => Err(Error::InvalidParameter {
                name: "method",
                value: other.to_string(),
                reason: "expected 'consensus' or 'ndvi'".to_string(),
            }),
        }
    }
}

/// A before/after epoch pair
#[derive(Debug, Clone)]
pub struct EpochPair {
    pub before: ImageEpoch,
    pub after: ImageEpoch,
}

impl Algorithm for DetectionMethod {
    type Input = EpochPair;
    type Output = DetectionResult;
    type Params = DetectionConfig;
    type Error = Error;

    fn name(&self) -> &'static str {
        DetectionMethod::name(self)
    }

    fn description(&self) -> &'static str {
        match self {
            DetectionMethod::Consensus => {
                "Two-of-three vote over adaptively thresholded NDVI, EVI and moisture deltas"
            }
            DetectionMethod::NdviDifference { .. } => "Fixed-threshold NDVI drop on NDVI forest",
        }
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        self.detect(&input.before, &input.after, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("consensus".parse::<DetectionMethod>().unwrap(), DetectionMethod::Consensus);
        assert_eq!(
            "NDVI".parse::<DetectionMethod>().unwrap(),
            DetectionMethod::NdviDifference {
                loss_threshold: 0.05,
                forest_ndvi: 0.2
            }
        );
        assert!("random-forest".parse::<DetectionMethod>().is_err());
    }

    #[test]
    fn test_method_validation() {
        let bad = DetectionMethod::NdviDifference {
            loss_threshold: 0.0,
            forest_ndvi: 0.2,
        };
        assert!(bad.validate().is_err());
        assert!(DetectionMethod::ndvi_difference().validate().is_ok());
        assert!(DetectionMethod::Consensus.validate().is_ok());
    }
}
