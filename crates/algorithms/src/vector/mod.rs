//! Geometry extraction
//!
//! Turns pixel clusters into closed, georeferenced polygons:
//! - **boundary**: outer-ring tracing along pixel edges, exposed-edge counts
//! - **polygon**: Douglas-Peucker simplification, hull and bounding-box
//!   fallbacks, mapping through the epoch `GeoTransform`

mod boundary;
mod polygon;

pub use boundary::{exposed_edges, trace_outer_boundary};
pub use polygon::{extract_polygon, BOUNDING_BOX_MAX_PIXELS};
