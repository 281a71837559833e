//! Reading and writing imagery
//!
//! [`read_geotiff`] and [`write_geotiff`] handle single-band GeoTIFFs with
//! ModelPixelScale/ModelTiepoint georeferencing. [`ImagerySource`] is the
//! boundary through which epochs enter a detection run.

mod geotiff;
mod source;

pub use geotiff::{
    read_geotiff, read_geotiff_from_buffer, read_geotiff_samples, write_geotiff,
    write_geotiff_to_buffer, SampleKind,
};
pub use source::{EpochRequest, GeoTiffDirectory, ImagerySource, INTEGER_REFLECTANCE_SCALE};
