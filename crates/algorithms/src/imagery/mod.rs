//! Imagery analysis
//!
//! - Spectral indices: NDVI, EVI, moisture stress
//! - Baseline forest classification (2-of-3 index conditions)
//! - Change detection: per-index deltas, adaptive thresholds, consensus vote

mod baseline;
mod change_detection;
mod indices;

pub use baseline::{classify_forest, ndvi_forest, BaselineParams};
pub use change_detection::{
    compute_deltas, detect_change, detect_ndvi_change, ChangeMap, IndexDeltas, MIN_VOTES,
};
pub use indices::{
    compute_epoch_pair, compute_indices, evi, moisture_index, ndvi, ComputeIndices, EviParams,
    IndexParams, SpectralIndices,
};
