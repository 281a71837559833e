//! Otsu histogram thresholding
//!
//! Picks the cut that maximizes between-class variance of a 1-D histogram
//! (Otsu, 1979). Whether the cut separates two real modes is judged on the
//! classes themselves: the gap between their means has to be several pooled
//! within-class standard deviations wide. Otsu's effectiveness η is reported
//! alongside but not used for the decision, since it shrinks with class
//! imbalance and a small clearing in a large scene is always imbalanced.

use clearcut_core::{ThresholdOutcome, ThresholdParams};

/// Best histogram split of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtsuSplit {
    /// Values strictly above this belong to the upper class
    pub threshold: f64,
    /// Between-class variance / total variance (η)
    pub separability: f64,
    pub lower_mean: f64,
    pub upper_mean: f64,
    /// `(upper_mean - lower_mean)` in pooled within-class standard deviations
    pub class_separation: f64,
    pub upper_count: usize,
}

/// Otsu split of `values` over `bins` equal-width bins spanning their range.
///
/// Returns `None` for fewer than two values, fewer than two bins, non-finite
/// input or zero spread.
pub fn otsu_threshold(values: &[f64], bins: usize) -> Option<OtsuSplit> {
    if values.len() < 2 || bins < 2 {
        return None;
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        if !v.is_finite() {
            return None;
        }
        min = min.min(v);
        max = max.max(v);
    }
    let range = max - min;
    if range <= f64::EPSILON * max.abs().max(1.0) {
        return None;
    }

    let width = range / bins as f64;
    let mut hist = vec![0usize; bins];
    for &v in values {
        let bin = (((v - min) / width) as usize).min(bins - 1);
        hist[bin] += 1;
    }

    let total = values.len() as f64;
    let center = |i: usize| min + (i as f64 + 0.5) * width;

    let mean_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| h as f64 * center(i))
        .sum::<f64>()
        / total;
    let var_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| h as f64 * (center(i) - mean_total).powi(2))
        .sum::<f64>()
        / total;
    if var_total <= 0.0 {
        return None;
    }

    let mut best_k = 0;
    let mut best_var = -1.0;
    let mut w0 = 0.0;
    let mut mu = 0.0;
    for k in 0..bins - 1 {
        let p = hist[k] as f64 / total;
        w0 += p;
        mu += p * center(k);
        let w1 = 1.0 - w0;
        if w0 <= 0.0 || w1 <= 1e-15 {
            continue;
        }
        let between = (mean_total * w0 - mu).powi(2) / (w0 * w1);
        if between > best_var {
            best_var = between;
            best_k = k;
        }
    }

    if best_var < 0.0 {
        return None;
    }

    let threshold = min + (best_k + 1) as f64 * width;
    let (lower, upper) = ClassMoments::split(values, threshold);
    if lower.count == 0 || upper.count == 0 {
        return None;
    }

    // Quantization floor: two-level data would otherwise have zero spread
    let pooled_var = ((lower.variance + upper.variance) / 2.0).max(width * width / 12.0);

    Some(OtsuSplit {
        threshold,
        separability: (best_var / var_total).clamp(0.0, 1.0),
        lower_mean: lower.mean,
        upper_mean: upper.mean,
        class_separation: (upper.mean - lower.mean) / pooled_var.sqrt(),
        upper_count: upper.count,
    })
}

/// Count, mean and population variance of one class
#[derive(Debug, Clone, Copy, Default)]
struct ClassMoments {
    count: usize,
    mean: f64,
    variance: f64,
}

impl ClassMoments {
    /// Moments of the values at or below `threshold` and of those above it
    fn split(values: &[f64], threshold: f64) -> (Self, Self) {
        let mut counts = [0usize; 2];
        let mut sums = [0.0; 2];
        for &v in values {
            let class = usize::from(v > threshold);
            counts[class] += 1;
            sums[class] += v;
        }
        let means = [0, 1].map(|c| {
            if counts[c] > 0 {
                sums[c] / counts[c] as f64
            } else {
                0.0
            }
        });

        let mut squares = [0.0; 2];
        for &v in values {
            let class = usize::from(v > threshold);
            squares[class] += (v - means[class]).powi(2);
        }

        let moments = |c: usize| ClassMoments {
            count: counts[c],
            mean: means[c],
            variance: if counts[c] > 0 {
                squares[c] / counts[c] as f64
            } else {
                0.0
            },
        };
        (moments(0), moments(1))
    }
}

/// Decide how one index votes, given its valid deltas.
///
/// * fewer than `min_valid_samples` values: abstain
/// * every value at or below `min_change_delta`: quiet, vote with the floor
/// * otherwise split with Otsu. A split whose classes are at least
///   `min_class_separation` pooled deviations apart, with at least
///   `min_change_samples` values above the cut, votes with
///   `max(otsu, min_change_delta)`. A split that fails is retried on its
///   upper class, up to `max_split_depth` splits in all, so that a rare
///   change mode hidden behind a split of the noise is still found.
/// * no separating split: abstain
pub fn adaptive_threshold(values: &[f64], params: &ThresholdParams) -> ThresholdOutcome {
    if values.len() < params.min_valid_samples {
        return ThresholdOutcome::Abstained {
            reason: format!(
                "{} valid samples, need {}",
                values.len(),
                params.min_valid_samples
            ),
        };
    }

    let floor = params.min_change_delta;
    if values.iter().all(|&v| v <= floor) {
        return ThresholdOutcome::Quiet { floor };
    }

    let mut candidates = values.to_vec();
    let mut best_separation: Option<f64> = None;
    for _ in 0..params.max_split_depth {
        if candidates.len() < params.min_valid_samples {
            break;
        }
        let Some(split) = otsu_threshold(&candidates, params.histogram_bins) else {
            break;
        };
        if split.class_separation >= params.min_class_separation
            && split.upper_count >= params.min_change_samples
        {
            return ThresholdOutcome::Threshold {
                value: split.threshold.max(floor),
                separability: split.separability,
                class_separation: split.class_separation,
            };
        }
        best_separation = Some(
            best_separation.map_or(split.class_separation, |b| b.max(split.class_separation)),
        );
        candidates.retain(|&v| v > split.threshold);
    }

    let reason = match best_separation {
        None => "no spread in deltas".to_string(),
        Some(best) => format!(
            "no separable split with {}+ change samples (best class separation {:.2}, need {:.2})",
            params.min_change_samples, best, params.min_class_separation
        ),
    };
    ThresholdOutcome::Abstained { reason }
}
