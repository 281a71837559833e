//! # Clearcut Algorithms
//!
//! Forest-loss change detection for Clearcut.
//!
//! ## Pipeline stages
//!
//! - **imagery**: NDVI, EVI and moisture indices, baseline forest
//!   classification, per-index deltas and the change vote
//! - **statistics**: Otsu thresholding with a class-separation check
//! - **morphology**: patch removal, disk closing, hole filling, disk opening
//! - **clustering**: Union-Find over raster adjacency or a k-d tree
//! - **vector**: boundary tracing, simplification, georeferencing
//! - **scoring**: cluster confidence
//! - **detection**: the strategies that run all of the above end to end

pub mod clustering;
pub mod detection;
pub mod imagery;
pub mod morphology;
pub mod scoring;
pub mod statistics;
pub mod vector;

pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::clustering::{cluster_pixels, cluster_points, ClusterParams, PixelCluster};
    pub use crate::detection::{DetectionMethod, EpochPair};
    pub use crate::imagery::{
        classify_forest, compute_deltas, compute_indices, detect_change, evi, moisture_index,
        ndvi, ChangeMap, SpectralIndices,
    };
    pub use crate::morphology::{refine_mask, RefineParams, StructuringElement};
    pub use crate::statistics::adaptive_threshold;
    pub use crate::vector::extract_polygon;
    pub use clearcut_core::prelude::*;
}
