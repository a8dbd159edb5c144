//! Land separation into upper and lower reservoir terrain
//!
//! Upper reservoirs need ground standing at least `head` metres above
//! something within reach; lower reservoirs need ground at least `head`
//! metres below something within reach. Reach is the horizontal distance
//! `head * slope_ratio`.

use crate::engine::{Layer, RasterVectorEngine};
use crate::error::{Result, SiteError};
use drygully_algorithms::statistics::{FocalParams, FocalStatistic};
use drygully_algorithms::terrain::ground_scale;
use drygully_core::raster::{Extent, Raster};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparationParams {
    /// Altitude difference between the reservoirs (m)
    pub head: f64,
    /// Horizontal distance per metre of head
    pub slope_ratio: f64,
    pub variant: Variant,
    /// Cell size in metres; taken from the DEM when `None`
    pub cell_size_m: Option<f64>,
}

impl Default for SeparationParams {
    fn default() -> Self {
        Self {
            head: 300.0,
            slope_ratio: 15.0,
            variant: Variant::Upper,
            cell_size_m: None,
        }
    }
}

impl SeparationParams {
    /// Focal window radius in cells
    pub fn radius(&self, cell_size_m: f64) -> usize {
        ((self.head * self.slope_ratio / cell_size_m).round() as usize).max(1)
    }
}

/// Elevations inside `extent` that can hold the requested reservoir
/// variant; every other cell is no-data.
pub fn separate_land<E: RasterVectorEngine + ?Sized>(
    engine: &E,
    extent: &Extent,
    params: &SeparationParams,
) -> Result<Raster<f64>> {
    if !(params.head > 0.0 && params.slope_ratio > 0.0) {
        return Err(SiteError::Config("head and slope ratio must be positive".into()));
    }

    let (statistic, stat_name) = match params.variant {
        Variant::Upper => (FocalStatistic::Min, "minimum"),
        Variant::Lower => (FocalStatistic::Max, "maximum"),
    };

    let dem = engine.window(Layer::Elevation, extent)?;
    let cell_size_m = params.cell_size_m.unwrap_or_else(|| {
        let (sx, sy) = ground_scale(&dem);
        dem.cell_size() * (sx + sy) / 2.0
    });
    let radius = params.radius(cell_size_m);
    info!("Focal {} over a {} cell radius ({:.1} m cells)", stat_name, radius, cell_size_m);

    let focal = engine.focal_statistics(
        Layer::Elevation,
        extent,
        FocalParams {
            radius,
            statistic,
            circular: true,
        },
    )?;

    let (rows, cols) = dem.shape();
    if focal.shape() != (rows, cols) {
        let (ar, ac) = focal.shape();
        return Err(drygully_core::Error::SizeMismatch { er: rows, ec: cols, ar, ac }.into());
    }

    let mut keep = dem.with_same_meta::<u8>(rows, cols);
    keep.set_nodata(Some(0));
    for ((row, col), k) in keep.data_mut().indexed_iter_mut() {
        let z = dem.data()[(row, col)];
        let f = focal.data()[(row, col)];
        if dem.is_nodata(z) || f.is_nan() {
            continue;
        }
        let diff = z - f;
        let dropped = match params.variant {
            Variant::Upper => diff <= params.head,
            Variant::Lower => diff >= -params.head,
        };
        *k = u8::from(!dropped);
    }

    let kept = keep.data().iter().filter(|&&k| k == 1).count();
    debug!("{} of {} cells kept", kept, rows * cols);
    engine.extract_by_mask(Layer::Elevation, &keep, extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NativeEngine;
    use drygully_core::{GeoTransform, CRS};

    /// Flat plain at 100 m with a single 200 m spike in the middle
    fn spike_engine() -> (NativeEngine, Extent) {
        let mut dem = Raster::filled(11, 11, 100.0);
        dem.set_transform(GeoTransform::new(138.0, -33.0, 0.0003, -0.0003));
        dem.set(5, 5, 200.0).unwrap();
        let extent = dem.extent();
        let fdir = dem.with_same_meta::<u8>(11, 11);
        let slope = dem.like(0.0);
        let engine = NativeEngine::new(dem, fdir, slope, CRS::wgs84(), CRS::australian_albers()).unwrap();
        (engine, extent)
    }

    fn params(variant: Variant) -> SeparationParams {
        SeparationParams {
            head: 60.0,
            slope_ratio: 1.0,
            variant,
            cell_size_m: Some(30.0),
        }
    }

    #[test]
    fn test_radius() {
        let p = SeparationParams::default();
        assert_eq!(p.radius(30.0), 150);
        assert_eq!(params(Variant::Upper).radius(30.0), 2);
        assert_eq!(params(Variant::Upper).radius(1e6), 1);
    }

    #[test]
    fn test_upper_keeps_high_ground() {
        let (engine, extent) = spike_engine();
        let upper = separate_land(&engine, &extent, &params(Variant::Upper)).unwrap();
        assert_eq!(upper.valid_count(), 1);
        assert_eq!(upper.get(5, 5).unwrap(), 200.0);
    }

    #[test]
    fn test_lower_keeps_ground_below_the_spike() {
        let (engine, extent) = spike_engine();
        let lower = separate_land(&engine, &extent, &params(Variant::Lower)).unwrap();
        // Radius-2 circle around the spike, without the spike itself
        assert_eq!(lower.valid_count(), 12);
        assert!(lower.get(5, 5).unwrap().is_nan());
        assert_eq!(lower.get(5, 7).unwrap(), 100.0);
        assert!(lower.get(3, 3).unwrap().is_nan());
    }

    #[test]
    fn test_cell_size_from_dem() {
        let (engine, extent) = spike_engine();
        let mut p = params(Variant::Upper);
        p.cell_size_m = None;
        // 0.0003 deg is about 30 m at 33 S, so the result does not change
        let upper = separate_land(&engine, &extent, &p).unwrap();
        assert_eq!(upper.valid_count(), 1);
    }

    #[test]
    fn test_rejects_zero_head() {
        let (engine, extent) = spike_engine();
        let mut p = params(Variant::Upper);
        p.head = 0.0;
        assert!(separate_land(&engine, &extent, &p).is_err());
    }
}
