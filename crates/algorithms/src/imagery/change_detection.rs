//! Multi-index change detection
//!
//! Deltas are taken on baseline-forest pixels only and oriented so that
//! clearing is positive for every index:
//! - NDVI loss = before - after
//! - EVI loss = before - after
//! - moisture gain = after - before (drying)
//!
//! Each delta grid gets its own adaptive threshold. A pixel is changed when
//! at least two indices vote for it; if fewer than two indices can vote at
//! all, the detector returns an empty mask and raises `LowSignal` instead of
//! guessing.

use ndarray::Array2;
use clearcut_core::raster::Raster;
use clearcut_core::{
    BinaryMask, DiagnosticFlag, Error, IndexDiagnostic, IndexKind, Result, ThresholdOutcome,
    ThresholdParams,
};
use tracing::{debug, warn};

use crate::maybe_rayon::*;
use crate::statistics::adaptive_threshold;

use super::indices::SpectralIndices;

/// Votes required to call a pixel changed
pub const MIN_VOTES: u8 = 2;

/// Per-index deltas, NaN outside baseline forest or where either epoch is invalid
#[derive(Debug, Clone)]
pub struct IndexDeltas {
    pub ndvi_loss: Raster<f64>,
    pub evi_loss: Raster<f64>,
    pub moisture_gain: Raster<f64>,
}

impl IndexDeltas {
    pub fn get(&self, kind: IndexKind) -> &Raster<f64> {
        match kind {
            IndexKind::Ndvi => &self.ndvi_loss,
            IndexKind::Evi => &self.evi_loss,
            IndexKind::Moisture => &self.moisture_gain,
        }
    }
}

/// Output of a change detector, before refinement
#[derive(Debug, Clone)]
pub struct ChangeMap {
    /// Changed pixels
    pub mask: BinaryMask,
    /// Number of indices that voted for each pixel
    pub votes: Raster<u8>,
    /// Indices taking part in the vote (3 for consensus, 1 for single-index)
    pub indices_considered: u8,
    pub diagnostics: Vec<IndexDiagnostic>,
    pub flags: Vec<DiagnosticFlag>,
}

impl ChangeMap {
    /// Whether every considered index voted for the pixel at `index`
    pub fn full_agreement(&self, index: usize) -> bool {
        self.votes.at(index) == Some(self.indices_considered)
    }
}

/// Delta grids restricted to `forest`
pub fn compute_deltas(
    before: &SpectralIndices,
    after: &SpectralIndices,
    forest: &BinaryMask,
) -> Result<IndexDeltas> {
    if before.shape() != forest.shape() || after.shape() != forest.shape() {
        return Err(Error::SizeMismatch {
            er: forest.rows(),
            ec: forest.cols(),
            ar: after.shape().0,
            ac: after.shape().1,
        });
    }

    let ndvi_loss = masked_difference(&before.ndvi, &after.ndvi, forest)?;
    let evi_loss = masked_difference(&before.evi, &after.evi, forest)?;
    let moisture_gain = masked_difference(&after.moisture, &before.moisture, forest)?;

    Ok(IndexDeltas {
        ndvi_loss,
        evi_loss,
        moisture_gain,
    })
}

/// `minuend - subtrahend` on mask pixels, NaN elsewhere
fn masked_difference(
    minuend: &Raster<f64>,
    subtrahend: &Raster<f64>,
    mask: &BinaryMask,
) -> Result<Raster<f64>> {
    let (rows, cols) = minuend.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                if !mask.get(row, col) {
                    continue;
                }
                let a = unsafe { minuend.get_unchecked(row, col) };
                let b = unsafe { subtrahend.get_unchecked(row, col) };
                if a.is_nan() || b.is_nan() {
                    continue;
                }
                row_data[col] = a - b;
            }
            row_data
        })
        .collect();

    let mut output = minuend.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Consensus change detection over all three indices
pub fn detect_change(
    deltas: &IndexDeltas,
    forest: &BinaryMask,
    params: &ThresholdParams,
) -> Result<ChangeMap> {
    let (rows, cols) = forest.shape();

    let outcomes: Vec<(IndexKind, usize, ThresholdOutcome)> = IndexKind::ALL
        .into_par_iter()
        .map(|kind| {
            let valid: Vec<f64> = deltas.get(kind).valid_values().collect();
            let outcome = adaptive_threshold(&valid, params);
            (kind, valid.len(), outcome)
        })
        .collect();

    for (kind, samples, outcome) in &outcomes {
        match outcome {
            ThresholdOutcome::Abstained { reason } => {
                warn!(index = %kind, samples, "index abstains: {}", reason)
            }
            other => debug!(index = %kind, samples, outcome = ?other, "index threshold"),
        }
    }

    let voters: Vec<(usize, f64)> = outcomes
        .iter()
        .enumerate()
        .filter_map(|(slot, (_, _, o))| o.voting_threshold().map(|t| (slot, t)))
        .collect();

    let mut votes = Raster::<u8>::new(rows, cols).with_transform(*forest.transform());
    let mut flags = Vec::new();
    let mut votes_cast = [0usize; 3];

    if voters.len() < MIN_VOTES as usize {
        warn!(
            voting_indices = voters.len(),
            "too few indices with usable thresholds; reporting low signal"
        );
        flags.push(DiagnosticFlag::LowSignal);
    } else {
        for &(slot, threshold) in &voters {
            let grid = deltas.get(IndexKind::ALL[slot]);
            for (v, &d) in votes.data_mut().iter_mut().zip(grid.data().iter()) {
                // NaN never exceeds a threshold
                if d > threshold {
                    *v += 1;
                    votes_cast[slot] += 1;
                }
            }
        }
    }

    let cells: Vec<bool> = votes
        .data()
        .iter()
        .zip(forest.cells())
        .map(|(&v, &f)| f && v >= MIN_VOTES)
        .collect();
    let mask = BinaryMask::from_vec(cells, rows, cols)?.with_transform(*forest.transform());

    let diagnostics = outcomes
        .into_iter()
        .enumerate()
        .map(|(i, (index, valid_samples, outcome))| IndexDiagnostic {
            index,
            valid_samples,
            outcome,
            votes_cast: votes_cast[i],
        })
        .collect();

    debug!(changed = mask.count(), "consensus vote");

    Ok(ChangeMap {
        mask,
        votes,
        indices_considered: IndexKind::ALL.len() as u8,
        diagnostics,
        flags,
    })
}

/// Single-index change detection: NDVI loss at or above a fixed threshold
pub fn detect_ndvi_change(
    deltas: &IndexDeltas,
    forest: &BinaryMask,
    loss_threshold: f64,
) -> Result<ChangeMap> {
    let (rows, cols) = forest.shape();
    let grid = &deltas.ndvi_loss;

    let mut votes = Raster::<u8>::new(rows, cols).with_transform(*forest.transform());
    let mut valid_samples = 0;
    for (v, &d) in votes.data_mut().iter_mut().zip(grid.data().iter()) {
        if d.is_nan() {
            continue;
        }
        valid_samples += 1;
        if d >= loss_threshold {
            *v = 1;
        }
    }

    let cells: Vec<bool> = votes
        .data()
        .iter()
        .zip(forest.cells())
        .map(|(&v, &f)| f && v == 1)
        .collect();
    let mask = BinaryMask::from_vec(cells, rows, cols)?.with_transform(*forest.transform());
    let changed = mask.count();
    debug!(changed, loss_threshold, "NDVI difference");

    Ok(ChangeMap {
        mask,
        votes,
        indices_considered: 1,
        diagnostics: vec![IndexDiagnostic {
            index: IndexKind::Ndvi,
            valid_samples,
            outcome: ThresholdOutcome::Fixed {
                value: loss_threshold,
            },
            votes_cast: changed,
        }],
        flags: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_indices(rows: usize, cols: usize, ndvi: f64, evi: f64, moisture: f64) -> SpectralIndices {
        SpectralIndices {
            ndvi: Raster::filled(rows, cols, ndvi),
            evi: Raster::filled(rows, cols, evi),
            moisture: Raster::filled(rows, cols, moisture),
        }
    }

    /// Forest everywhere, bare soil inside a `size x size` block at (5, 5)
    fn clearing(rows: usize, cols: usize, size: usize) -> (SpectralIndices, SpectralIndices) {
        let before = uniform_indices(rows, cols, 0.8, 0.5, 0.1);
        let mut after = before.clone();
        for r in 5..5 + size {
            for c in 5..5 + size {
                after.ndvi.set(r, c, 0.1).unwrap();
                after.evi.set(r, c, 0.05).unwrap();
                after.moisture.set(r, c, 0.6).unwrap();
            }
        }
        (before, after)
    }

    #[test]
    fn test_deltas_are_clearing_positive() {
        let (before, after) = clearing(20, 20, 4);
        let forest = BinaryMask::from_fn(20, 20, |_, _| true);
        let d = compute_deltas(&before, &after, &forest).unwrap();

        assert!((d.ndvi_loss.get(6, 6).unwrap() - 0.7).abs() < 1e-10);
        assert!((d.evi_loss.get(6, 6).unwrap() - 0.45).abs() < 1e-10);
        assert!((d.moisture_gain.get(6, 6).unwrap() - 0.5).abs() < 1e-10);
        assert_eq!(d.ndvi_loss.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_deltas_restricted_to_forest() {
        let (before, after) = clearing(20, 20, 4);
        let forest = BinaryMask::from_fn(20, 20, |r, _| r < 6);
        let d = compute_deltas(&before, &after, &forest).unwrap();
        assert!(d.ndvi_loss.get(7, 7).unwrap().is_nan());
        assert!(!d.ndvi_loss.get(5, 5).unwrap().is_nan());
    }

    #[test]
    fn test_consensus_finds_block() {
        let (before, after) = clearing(30, 30, 6);
        let forest = BinaryMask::from_fn(30, 30, |_, _| true);
        let d = compute_deltas(&before, &after, &forest).unwrap();
        let change = detect_change(&d, &forest, &ThresholdParams::default()).unwrap();

        assert_eq!(change.mask.count(), 36);
        assert!(change.flags.is_empty());
        assert!(change.full_agreement(5 * 30 + 5));
        assert!(change.diagnostics.iter().all(|d| d.votes_cast == 36));
    }

    #[test]
    fn test_identical_epochs_are_quiet() {
        let before = uniform_indices(10, 10, 0.8, 0.5, 0.1);
        let forest = BinaryMask::from_fn(10, 10, |_, _| true);
        let d = compute_deltas(&before, &before, &forest).unwrap();
        let change = detect_change(&d, &forest, &ThresholdParams::default()).unwrap();

        assert!(change.mask.none());
        assert!(change.flags.is_empty(), "Quiet indices still vote");
        assert!(change
            .diagnostics
            .iter()
            .all(|d| matches!(d.outcome, ThresholdOutcome::Quiet { .. })));
    }

    #[test]
    fn test_low_signal_when_indices_abstain() {
        // Only 16 forest pixels: below the sample minimum for every index
        let (before, after) = clearing(20, 20, 4);
        let forest = BinaryMask::from_fn(20, 20, |r, c| (5..9).contains(&r) && (5..9).contains(&c));
        let d = compute_deltas(&before, &after, &forest).unwrap();
        let change = detect_change(&d, &forest, &ThresholdParams::default()).unwrap();

        assert!(change.mask.none());
        assert_eq!(change.flags, vec![DiagnosticFlag::LowSignal]);
    }

    /// Deterministic, bounded, roughly normal noise with unit variance
    fn noise(seed: u64, index: u64) -> f64 {
        let mut z = seed
            .wrapping_mul(0x100000001B3)
            .wrapping_add(index)
            .wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^= z >> 31;
        let sum: f64 = (0..4)
            .map(|k| ((z >> (16 * k)) & 0xFFFF) as f64 / 65535.0)
            .sum();
        (sum - 2.0) * 3.0_f64.sqrt()
    }

    #[test]
    fn test_small_clearing_in_noisy_scene() {
        // 400 cleared pixels out of 90 000, delta noise sd 0.03
        let (rows, cols) = (300, 300);
        let cleared = |i: usize| (100..120).contains(&(i / cols)) && (140..160).contains(&(i % cols));
        let grid = |seed: u64, loss: f64| {
            let data = (0..rows * cols)
                .map(|i| 0.03 * noise(seed, i as u64) + if cleared(i) { loss } else { 0.0 })
                .collect();
            Raster::from_vec(data, rows, cols).unwrap()
        };
        let d = IndexDeltas {
            ndvi_loss: grid(1, 0.7),
            evi_loss: grid(2, 0.45),
            moisture_gain: grid(3, 0.5),
        };
        let forest = BinaryMask::from_fn(rows, cols, |_, _| true);

        let change = detect_change(&d, &forest, &ThresholdParams::default()).unwrap();

        assert!(change.flags.is_empty(), "got {:?}", change.diagnostics);
        assert!(change
            .diagnostics
            .iter()
            .all(|d| matches!(d.outcome, ThresholdOutcome::Threshold { .. })));
        assert_eq!(change.mask.count(), 400);
        assert!(change.mask.iter_set().all(|i| cleared(i)));
    }

    #[test]
    fn test_ndvi_difference() {
        let (before, after) = clearing(20, 20, 3);
        let forest = BinaryMask::from_fn(20, 20, |_, _| true);
        let d = compute_deltas(&before, &after, &forest).unwrap();
        let change = detect_ndvi_change(&d, &forest, 0.05).unwrap();

        assert_eq!(change.mask.count(), 9);
        assert!(change.full_agreement(5 * 20 + 5));
        assert!(change.flags.is_empty());
    }
}
