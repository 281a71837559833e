//! Baseline forest classification
//!
//! A pixel is baseline forest when at least two of three conditions hold on
//! the *before* epoch: NDVI above its threshold, EVI above its threshold,
//! moisture index below its threshold. A NaN index never satisfies its
//! condition.

use clearcut_core::{BinaryMask, DetectionConfig, Result};
use tracing::debug;

use crate::maybe_rayon::*;

use super::indices::SpectralIndices;

/// Parameters for baseline forest classification
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineParams {
    pub ndvi_threshold: f64,
    pub evi_threshold: f64,
    pub moisture_threshold: f64,
    /// Conditions that must hold (default: 2 of 3)
    pub min_conditions: usize,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

impl From<&DetectionConfig> for BaselineParams {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            ndvi_threshold: config.ndvi_forest_threshold,
            evi_threshold: config.evi_forest_threshold,
            moisture_threshold: config.moisture_forest_threshold,
            min_conditions: 2,
        }
    }
}

/// Classify baseline forest from the before-epoch indices
pub fn classify_forest(before: &SpectralIndices, params: &BaselineParams) -> Result<BinaryMask> {
    let (rows, cols) = before.shape();

    let cells: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for col in 0..cols {
                let ndvi = unsafe { before.ndvi.get_unchecked(row, col) };
                let evi = unsafe { before.evi.get_unchecked(row, col) };
                let moisture = unsafe { before.moisture.get_unchecked(row, col) };

                // NaN comparisons are false, so invalid indices never count
                let met = (ndvi > params.ndvi_threshold) as usize
                    + (evi > params.evi_threshold) as usize
                    + (moisture < params.moisture_threshold) as usize;

                row_data[col] = met >= params.min_conditions;
            }
            row_data
        })
        .collect();

    let mask = BinaryMask::from_vec(cells, rows, cols)?.with_transform(*before.ndvi.transform());
    debug!(forest_pixels = mask.count(), "classified baseline forest");
    Ok(mask)
}

/// Pixels whose before-NDVI exceeds `threshold` (single-index baseline)
pub fn ndvi_forest(before: &SpectralIndices, threshold: f64) -> Result<BinaryMask> {
    let (rows, cols) = before.shape();
    let cells = before.ndvi.data().iter().map(|&v| v > threshold).collect();
    Ok(BinaryMask::from_vec(cells, rows, cols)?.with_transform(*before.ndvi.transform()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearcut_core::Raster;

    fn make_indices(ndvi: f64, evi: f64, moisture: f64) -> SpectralIndices {
        SpectralIndices {
            ndvi: Raster::filled(3, 3, ndvi),
            evi: Raster::filled(3, 3, evi),
            moisture: Raster::filled(3, 3, moisture),
        }
    }

    #[test]
    fn test_all_three_conditions() {
        let mask = classify_forest(&make_indices(0.8, 0.5, 0.1), &BaselineParams::default()).unwrap();
        assert_eq!(mask.count(), 9);
    }

    #[test]
    fn test_two_of_three_is_enough() {
        // High NDVI and EVI, but wet-stress moisture
        let mask = classify_forest(&make_indices(0.8, 0.5, 0.5), &BaselineParams::default()).unwrap();
        assert_eq!(mask.count(), 9);

        let mask = classify_forest(&make_indices(0.8, 0.1, 0.5), &BaselineParams::default()).unwrap();
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn test_nan_index_does_not_count() {
        let mut idx = make_indices(0.8, 0.5, 0.5);
        idx.evi.set(1, 1, f64::NAN).unwrap();
        let mask = classify_forest(&idx, &BaselineParams::default()).unwrap();
        assert!(!mask.get(1, 1));
        assert_eq!(mask.count(), 8);
    }

    #[test]
    fn test_ndvi_forest() {
        let mut idx = make_indices(0.3, 0.0, 0.0);
        idx.ndvi.set(0, 0, 0.1).unwrap();
        let mask = ndvi_forest(&idx, 0.2).unwrap();
        assert_eq!(mask.count(), 8);
    }
}
