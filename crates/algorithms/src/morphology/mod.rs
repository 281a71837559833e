//! Binary morphology for change masks
//!
//! - **Erosion** / **Dilation** with square or disk structuring elements
//! - **Opening**: erosion then dilation (removes spurs and thin bridges)
//! - **Closing**: dilation then erosion (bridges small gaps)
//! - **Components**: 8-connected patch removal and enclosed-hole filling
//! - **Refine**: the full clean-up applied to a raw change mask

mod closing;
mod components;
mod dilate;
mod element;
mod erode;
mod opening;
mod refine;

pub use closing::closing;
pub use components::{connected_components, fill_holes, remove_small_components};
pub use dilate::dilate;
pub use element::StructuringElement;
pub use erode::erode;
pub use opening::opening;
pub use refine::{refine_mask, RefineMask, RefineParams};
