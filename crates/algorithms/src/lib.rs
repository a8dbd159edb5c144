//! # DryGully Algorithms
//!
//! Raster and vector operations used to screen reservoir sites.
//!
//! ## Categories
//!
//! - **hydrology**: Depression filling, D8 flow direction, watersheds
//! - **terrain**: Slope
//! - **statistics**: Focal statistics, masked cell summaries
//! - **extract**: Masking rasters by value, mask, polygon or line
//! - **vector**: Polygonize, overlay, buffer, smoothing, measurements

pub mod extract;
pub mod hydrology;
pub mod maybe_rayon;
pub mod statistics;
pub mod terrain;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::extract::{cells_along_lines, cells_in_polygons, extract_at_most, extract_by_mask};
    pub use crate::hydrology::{
        flow_direction, priority_flood, watershed, FlowDirectionParams, PriorityFloodParams, WatershedParams,
    };
    pub use crate::statistics::{cell_summary, focal_statistics, CellSummary, FocalParams, FocalStatistic};
    pub use crate::terrain::{ground_scale, slope, SlopeParams, SlopeUnits};
    pub use crate::vector::{polygonize, shared_boundary};
    pub use drygully_core::prelude::*;
}
