//! Statistical analysis of raster data
//!
//! - **focal**: moving window statistics
//! - **masked**: summary of the cells selected by a mask

mod focal;
mod masked;

pub use focal::{focal_statistics, FocalParams, FocalStatistic};
pub use masked::{cell_summary, CellSummary};
