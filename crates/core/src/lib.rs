//! # Clearcut Core
//!
//! Core types and I/O for the Clearcut forest-loss detector.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `BinaryMask`: Boolean grid produced by classification and voting
//! - `ImageEpoch`: A set of reflectance bands captured on one date
//! - `DetectionConfig`: Explicit per-invocation tuning values
//! - `DetectionResult`: Confidence-scored loss polygons plus diagnostics
//! - `ImagerySource`: The boundary where imagery enters the core

pub mod config;
pub mod epoch;
pub mod error;
pub mod io;
pub mod raster;
pub mod result;

pub use config::{ClusterLinking, ConfidenceParams, DetectionConfig, ThresholdParams};
pub use epoch::{Band, ImageEpoch, RasterBand};
pub use error::{Error, Result};
pub use io::{EpochRequest, GeoTiffDirectory, ImagerySource};
pub use raster::{BinaryMask, GeoTransform, Raster, RasterElement};
pub use result::{
    DetectionResult, DetectionStatus, DiagnosticFlag, IndexDiagnostic, IndexKind, LossFeature,
    Severity, ThresholdOutcome,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::DetectionConfig;
    pub use crate::epoch::{Band, ImageEpoch};
    pub use crate::error::{Error, Result};
    pub use crate::raster::{BinaryMask, GeoTransform, Raster, RasterElement};
    pub use crate::result::{DetectionResult, DetectionStatus, DiagnosticFlag};
    pub use crate::Algorithm;
}

/// Core trait for pipeline stages.
///
/// Stages are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
