//! Raster/vector engine capability
//!
//! Everything the screener and the pretty-set builder ask of a GIS backend
//! goes through [`RasterVectorEngine`]. Raster operations take their
//! processing window as an explicit [`Extent`]; nothing in the engine holds
//! a "current" extent, so one engine can serve many points at once.
//!
//! The geometry operations have default implementations over
//! `drygully_algorithms::vector`; a backend only needs to supply the raster
//! side and the reprojection.

mod native;

pub use native::{condition, NativeEngine};

use crate::error::Result;
use drygully_algorithms::statistics::{CellSummary, FocalParams};
use drygully_algorithms::vector;
use drygully_core::raster::{Extent, Raster};
use drygully_core::CRS;
use geo::{Geometry, MultiLineString, MultiPolygon, Polygon};

/// Raster layers an engine exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Ground elevation (m)
    Elevation,
    /// Terrain slope (degrees)
    Slope,
}

pub trait RasterVectorEngine: Sync {
    /// CRS of the rasters and of every geometry the raster side returns
    fn source_crs(&self) -> CRS;

    /// CRS used for area and length measurements
    fn projected_crs(&self) -> CRS;

    /// Catchment draining to the cell containing `(x, y)`, as a mask over
    /// the cells of `extent` (1 inside, no-data 0).
    ///
    /// `None` when the point is not on the grid or the window misses it.
    fn watershed(&self, x: f64, y: f64, extent: &Extent) -> Result<Option<Raster<u8>>>;

    /// Cells of `layer` whose centers fall inside `extent`
    fn window(&self, layer: Layer, extent: &Extent) -> Result<Raster<f64>>;

    /// Values of `layer` inside `extent` where `mask` is set
    fn extract_by_mask(&self, layer: Layer, mask: &Raster<u8>, extent: &Extent) -> Result<Raster<f64>>;

    /// Cells of `values` not above `max_value`
    fn extract_at_most(&self, values: &Raster<f64>, max_value: f64) -> Raster<f64> {
        drygully_algorithms::extract::extract_at_most(values, max_value)
    }

    fn focal_statistics(&self, layer: Layer, extent: &Extent, params: FocalParams) -> Result<Raster<f64>>;

    /// Summary of `layer` over the cells whose centers fall in `polygons`
    fn summarize_polygons(&self, layer: Layer, polygons: &MultiPolygon<f64>, extent: &Extent)
    -> Result<Option<CellSummary>>;

    /// Summary of `layer` over the cells touched by `lines`
    fn summarize_lines(&self, layer: Layer, lines: &MultiLineString<f64>, extent: &Extent)
    -> Result<Option<CellSummary>>;

    /// Source CRS to projected CRS
    fn project(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>>;

    /// Projected CRS back to source CRS
    fn unproject(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>>;

    /// Polygons of the set cells of `mask`
    fn polygonize(&self, mask: &Raster<u8>) -> Vec<Polygon<f64>> {
        vector::polygonize(mask)
    }

    /// Flat-ended buffer on both sides of `lines`
    fn buffer_lines(&self, lines: &MultiLineString<f64>, distance: f64) -> MultiPolygon<f64> {
        let params = vector::BufferParams { distance, segments: 32 };
        vector::buffer_lines_flat(lines, &params)
    }

    fn erase(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        vector::erase(a, b)
    }

    fn merge(&self, parts: &[Polygon<f64>]) -> MultiPolygon<f64> {
        vector::merge(parts)
    }

    fn intersect(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        vector::intersect(a, b)
    }

    /// Stretches of boundary shared by two polygons
    fn boundary_intersection(&self, a: &Polygon<f64>, b: &Polygon<f64>, tolerance: f64) -> MultiLineString<f64> {
        vector::shared_boundary(a, b, tolerance)
    }

    fn smooth(&self, polygons: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
        vector::smooth_multipolygon(polygons, tolerance)
    }
}
