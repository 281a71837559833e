//! Statistical helpers for the change detector
//!
//! - **otsu**: adaptive histogram thresholding with a class-separation check

mod otsu;

pub use otsu::{adaptive_threshold, otsu_threshold, OtsuSplit};
