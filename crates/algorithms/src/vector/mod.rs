//! Vector operations
//!
//! - Polygonize: raster regions to polygons
//! - Overlay: intersection, erase, merge, shared boundaries
//! - Buffer: point circles and flat-ended line corridors
//! - Smooth: Gaussian ring smoothing
//! - Area / Length: planar measurements

mod buffer;
pub mod measurements;
mod overlay;
mod polygonize;
mod smooth;

pub use buffer::{buffer_lines_flat, buffer_point, BufferParams};
pub use measurements::{area, length, line_length, perimeter};
pub use overlay::{erase, intersect, largest_polygon, merge, shared_boundary};
pub use polygonize::polygonize;
pub use smooth::{smooth_multipolygon, smooth_polygon, smooth_ring};
