//! Terrain analysis
//!
//! - Slope: Horn (1981) gradient magnitude
//! - Ground scale: metres per map unit along each axis

mod slope;

pub use slope::{slope, SlopeParams, SlopeUnits};

use drygully_core::crs::{meridian_radius, parallel_radius, Ellipsoid};
use drygully_core::raster::{Raster, RasterElement};

/// Metres per map unit along x and y at the raster's center.
///
/// Geographic rasters scale by the GRS80 radii at the center latitude;
/// projected rasters and rasters without a CRS are taken to be in metres.
pub fn ground_scale<T: RasterElement>(raster: &Raster<T>) -> (f64, f64) {
    if !raster.crs().is_some_and(|crs| crs.is_geographic()) {
        return (1.0, 1.0);
    }
    let (_, lat) = raster.extent().center();
    let per_degree = std::f64::consts::PI / 180.0;
    (
        parallel_radius(lat, Ellipsoid::GRS80) * per_degree,
        meridian_radius(lat, Ellipsoid::GRS80) * per_degree,
    )
}
