//! # DryGully Core
//!
//! Core types, traits and I/O shared by the DryGully screening crates.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `Extent`: Axis-aligned processing window
//! - `CRS`: Coordinate Reference System handling and map projections
//! - `Feature`: Geometry plus attributes, for site features
//! - I/O for GeoTIFF rasters

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::{Projection, CRS};
pub use error::{Error, Result};
pub use raster::{Extent, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{Projection, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Extent, GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature};
}
