//! Heuristic confidence for a loss cluster
//!
//! Three terms in [0, 1], combined as a normalized weighted mean:
//!
//! - **size**: `1 - exp(-3n / saturation)`, monotone with diminishing
//!   returns; about 0.95 at the saturation size
//! - **agreement**: fraction of pixels on which every considered index voted
//! - **compactness**: `min(1, 4πA / P²)` with `A` the pixel count and `P` the
//!   exposed pixel-edge count. Pixel perimeters overstate the perimeter of
//!   the underlying shape, so this is a relative ranking measure: a square
//!   scores π/4 and a one-pixel-wide line approaches zero.
//!
//! The weights are uncalibrated. Scores rank clusters; they are not
//! probabilities.

use std::f64::consts::PI;

use clearcut_core::ConfidenceParams;

/// Measurements of one cluster that the score depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterEvidence {
    pub pixel_count: usize,
    /// Pixels on which every considered index voted
    pub full_agreement_pixels: usize,
    /// Pixel edges shared with non-cluster pixels
    pub exposed_edges: usize,
}

/// Score and its terms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceScore {
    pub size: f64,
    pub agreement: f64,
    pub compactness: f64,
    pub confidence: f64,
}

/// Saturating size term
pub fn size_term(pixel_count: usize, saturation_pixels: usize) -> f64 {
    let saturation = saturation_pixels.max(1) as f64;
    1.0 - (-3.0 * pixel_count as f64 / saturation).exp()
}

/// Isoperimetric compactness from pixel area and exposed-edge perimeter
pub fn compactness(pixel_count: usize, exposed_edges: usize) -> f64 {
    if exposed_edges == 0 {
        return 0.0;
    }
    let p = exposed_edges as f64;
    (4.0 * PI * pixel_count as f64 / (p * p)).min(1.0)
}

/// Confidence of a non-empty cluster
pub fn score(evidence: &ClusterEvidence, params: &ConfidenceParams) -> ConfidenceScore {
    let n = evidence.pixel_count;
    let size = size_term(n, params.size_saturation_pixels);
    let agreement = if n == 0 {
        0.0
    } else {
        evidence.full_agreement_pixels.min(n) as f64 / n as f64
    };
    let compactness = compactness(n, evidence.exposed_edges);

    let weight_sum = params.size_weight + params.agreement_weight + params.compactness_weight;
    let weighted = params.size_weight * size
        + params.agreement_weight * agreement
        + params.compactness_weight * compactness;
    let confidence = if weight_sum > 0.0 {
        (weighted / weight_sum).clamp(0.0, 1.0)
    } else {
        0.0
    };

    ConfidenceScore {
        size,
        agreement,
        compactness,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(side: usize, agreeing: usize) -> ClusterEvidence {
        ClusterEvidence {
            pixel_count: side * side,
            full_agreement_pixels: agreeing,
            exposed_edges: 4 * side,
        }
    }

    #[test]
    fn test_size_term_saturates() {
        assert_relative_eq!(size_term(0, 100), 0.0);
        assert!(size_term(100, 100) > 0.95);
        assert!(size_term(1000, 100) > 0.9999);
        assert!(size_term(100, 100) < 1.0);
    }

    #[test]
    fn test_compactness_of_square_and_line() {
        assert_relative_eq!(compactness(400, 80), PI / 4.0, epsilon = 1e-12);
        let line = compactness(50, 2 * 50 + 2);
        assert!(line < 0.07, "Expected a thin line to score low, got {}", line);
    }

    #[test]
    fn test_larger_never_scores_lower() {
        let params = ConfidenceParams::default();
        let mut previous = 0.0;
        for side in 1..30 {
            let s = score(&square(side, side * side), &params).confidence;
            assert!(s >= previous, "Expected {} >= {} at side {}", s, previous, side);
            previous = s;
        }
    }

    #[test]
    fn test_more_agreement_never_scores_lower() {
        let params = ConfidenceParams::default();
        let half = score(&square(10, 50), &params).confidence;
        let full = score(&square(10, 100), &params).confidence;
        assert!(full > half);
    }

    #[test]
    fn test_more_compact_never_scores_lower() {
        let params = ConfidenceParams::default();
        let blob = score(&square(10, 100), &params).confidence;
        let strip = score(
            &ClusterEvidence {
                pixel_count: 100,
                full_agreement_pixels: 100,
                exposed_edges: 202,
            },
            &params,
        )
        .confidence;
        assert!(blob > strip);
    }

    #[test]
    fn test_clean_block_clears_alert_level() {
        // 20x20 block with its four corners rounded off by the disk opening
        let evidence = ClusterEvidence {
            pixel_count: 396,
            full_agreement_pixels: 396,
            exposed_edges: 80,
        };
        let s = score(&evidence, &ConfidenceParams::default());
        assert!(s.confidence > 0.9, "Expected > 0.9, got {}", s.confidence);
        assert!(s.confidence <= 1.0);
    }
}
