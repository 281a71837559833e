//! Detection output types

use std::fmt;

use geo_types::Polygon;
use serde::Serialize;

/// NDVI loss above which a feature is classed as high severity
pub const HIGH_SEVERITY_NDVI_LOSS: f64 = 0.3;

/// Spectral index identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Ndvi,
    Evi,
    Moisture,
}

impl IndexKind {
    pub const ALL: [IndexKind; 3] = [IndexKind::Ndvi, IndexKind::Evi, IndexKind::Moisture];

    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "ndvi",
            IndexKind::Evi => "evi",
            IndexKind::Moisture => "moisture",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the adaptive threshold decided for one index
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ThresholdOutcome {
    /// A usable split was found. `class_separation` is the gap between the
    /// class means in pooled standard deviations; `separability` is the Otsu
    /// effectiveness η of that split, kept for diagnostics.
    Threshold {
        value: f64,
        separability: f64,
        class_separation: f64,
    },
    /// Every valid delta sits at or below the floor: the index votes "no change"
    Quiet { floor: f64 },
    /// A caller-supplied threshold (single-index strategies)
    Fixed { value: f64 },
    /// The index does not vote
    Abstained { reason: String },
}

impl ThresholdOutcome {
    /// Threshold this index votes with, if it votes at all
    pub fn voting_threshold(&self) -> Option<f64> {
        match self {
            ThresholdOutcome::Threshold { value, .. } => Some(*value),
            ThresholdOutcome::Quiet { floor } => Some(*floor),
            ThresholdOutcome::Fixed { value } => Some(*value),
            ThresholdOutcome::Abstained { .. } => None,
        }
    }

    pub fn votes(&self) -> bool {
        self.voting_threshold().is_some()
    }
}

/// Per-index summary of the change detector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDiagnostic {
    pub index: IndexKind,
    /// Forest pixels with a valid delta
    pub valid_samples: usize,
    pub outcome: ThresholdOutcome,
    /// Forest pixels whose delta exceeded the voting threshold
    pub votes_cast: usize,
}

/// Non-fatal conditions reported alongside a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticFlag {
    /// Fewer than two indices produced a usable threshold
    LowSignal,
}

impl fmt::Display for DiagnosticFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticFlag::LowSignal => f.write_str("LowSignal"),
        }
    }
}

/// Overall reading of a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    ChangeDetected,
    NoChange,
    /// Not enough signal to tell; distinct from `NoChange`
    Inconclusive,
}

/// Severity class of a loss feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Moderate,
    High,
}

impl Severity {
    pub fn from_ndvi_loss(mean_ndvi_loss: f64) -> Self {
        if mean_ndvi_loss > HIGH_SEVERITY_NDVI_LOSS {
            Severity::High
        } else {
            Severity::Moderate
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Moderate => f.write_str("moderate"),
            Severity::High => f.write_str("high"),
        }
    }
}

/// One region of detected forest loss
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossFeature {
    /// Outline in (lon, lat); the exterior ring is closed
    pub polygon: Polygon<f64>,
    /// `pixel_count * pixel_area_m2 / 10000`
    pub area_ha: f64,
    pub confidence: f64,
    pub pixel_count: usize,
    pub severity: Severity,
    pub mean_ndvi_loss: f64,
    pub mean_evi_loss: f64,
    pub mean_moisture_gain: f64,
    /// Fraction of pixels on which all three indices voted
    pub full_agreement_fraction: f64,
    pub compactness: f64,
    /// Row-major index of the cluster's first pixel
    pub first_pixel: usize,
}

impl LossFeature {
    /// Closed exterior ring as `[lon, lat]` pairs
    pub fn ring(&self) -> Vec<[f64; 2]> {
        self.polygon
            .exterior()
            .coords()
            .map(|c| [c.x, c.y])
            .collect()
    }

    pub fn is_alert(&self, min_confidence: f64) -> bool {
        self.confidence >= min_confidence
    }
}

/// Output of one detection invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    /// Sorted by area descending, ties by first pixel
    pub features: Vec<LossFeature>,
    pub total_area_ha: f64,
    pub feature_count: usize,
    pub flags: Vec<DiagnosticFlag>,
    pub diagnostics: Vec<IndexDiagnostic>,
    /// Pixels set in the refined change mask
    pub changed_pixels: usize,
}

impl DetectionResult {
    /// Assemble a result, ordering features and deriving the totals
    pub fn new(
        mut features: Vec<LossFeature>,
        flags: Vec<DiagnosticFlag>,
        diagnostics: Vec<IndexDiagnostic>,
        changed_pixels: usize,
    ) -> Self {
        features.sort_by(|a, b| {
            b.area_ha
                .total_cmp(&a.area_ha)
                .then(a.first_pixel.cmp(&b.first_pixel))
        });
        let total_area_ha = features.iter().map(|f| f.area_ha).sum();
        let feature_count = features.len();
        Self {
            features,
            total_area_ha,
            feature_count,
            flags,
            diagnostics,
            changed_pixels,
        }
    }

    /// An empty result carrying only flags and diagnostics
    pub fn empty(flags: Vec<DiagnosticFlag>, diagnostics: Vec<IndexDiagnostic>) -> Self {
        Self::new(Vec::new(), flags, diagnostics, 0)
    }

    pub fn has_flag(&self, flag: DiagnosticFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn status(&self) -> DetectionStatus {
        if self.has_flag(DiagnosticFlag::LowSignal) {
            DetectionStatus::Inconclusive
        } else if self.feature_count > 0 {
            DetectionStatus::ChangeDetected
        } else {
            DetectionStatus::NoChange
        }
    }

    /// Features with confidence at or above `min_confidence`
    pub fn alerts(&self, min_confidence: f64) -> impl Iterator<Item = &LossFeature> + '_ {
        self.features
            .iter()
            .filter(move |f| f.is_alert(min_confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn feature(pixels: usize, confidence: f64, first_pixel: usize) -> LossFeature {
        let ring = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        LossFeature {
            polygon: Polygon::new(ring, vec![]),
            area_ha: pixels as f64 * 100.0 / 10_000.0,
            confidence,
            pixel_count: pixels,
            severity: Severity::High,
            mean_ndvi_loss: 0.7,
            mean_evi_loss: 0.45,
            mean_moisture_gain: 0.5,
            full_agreement_fraction: 1.0,
            compactness: 0.8,
            first_pixel,
        }
    }

    #[test]
    fn test_sorting_and_totals() {
        let result = DetectionResult::new(
            vec![feature(12, 0.5, 40), feature(30, 0.9, 90), feature(12, 0.6, 10)],
            vec![],
            vec![],
            54,
        );
        let firsts: Vec<usize> = result.features.iter().map(|f| f.first_pixel).collect();
        assert_eq!(firsts, vec![90, 10, 40]);
        assert_eq!(result.feature_count, 3);
        assert!((result.total_area_ha - 0.54).abs() < 1e-12);
        assert_eq!(result.status(), DetectionStatus::ChangeDetected);
        assert_eq!(result.alerts(0.7).count(), 1);
    }

    #[test]
    fn test_low_signal_is_not_no_change() {
        let quiet = DetectionResult::empty(vec![], vec![]);
        assert_eq!(quiet.status(), DetectionStatus::NoChange);

        let weak = DetectionResult::empty(vec![DiagnosticFlag::LowSignal], vec![]);
        assert_eq!(weak.status(), DetectionStatus::Inconclusive);
    }

    #[test]
    fn test_ring_is_closed() {
        let ring = feature(10, 0.5, 0).ring();
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring.len(), 5);
    }

    #[test]
    fn test_severity() {
        assert_eq!(Severity::from_ndvi_loss(0.31), Severity::High);
        assert_eq!(Severity::from_ndvi_loss(0.3), Severity::Moderate);
    }

    #[test]
    fn test_outcome_voting() {
        assert_eq!(ThresholdOutcome::Quiet { floor: 0.05 }.voting_threshold(), Some(0.05));
        assert!(!ThresholdOutcome::Abstained {
            reason: "unimodal".into()
        }
        .votes());
    }
}
