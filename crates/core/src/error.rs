//! Error types for Clearcut

use thiserror::Error;

use crate::epoch::Band;

/// Main error type for Clearcut operations.
///
/// `MissingBand` and `MisalignedEpochs` describe malformed input and are
/// always fatal. Weak statistical signal is not an error; it is reported
/// through [`DiagnosticFlag::LowSignal`](crate::result::DiagnosticFlag).
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Epoch '{epoch}' is missing required band {band}")]
    MissingBand { epoch: String, band: Band },

    #[error("Epochs are misaligned: {reason}")]
    MisalignedEpochs { reason: String },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error was caused by malformed input epochs.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::MissingBand { .. } | Error::MisalignedEpochs { .. } | Error::SizeMismatch { .. }
        )
    }
}

/// Result type alias for Clearcut operations
pub type Result<T> = std::result::Result<T, Error>;
