//! In-memory engine over DEM, flow direction and slope rasters

use super::{Layer, RasterVectorEngine};
use crate::config::{CrsConfig, InputPaths};
use crate::error::{Result, SiteError};
use drygully_algorithms::extract::{cells_along_lines, cells_in_polygons, extract_by_mask};
use drygully_algorithms::hydrology::{
    flow_direction, priority_flood, watershed, FlowDirectionParams, PriorityFloodParams, WatershedParams,
};
use drygully_algorithms::statistics::{cell_summary, focal_statistics, CellSummary, FocalParams};
use drygully_algorithms::terrain::{ground_scale, slope, SlopeParams, SlopeUnits};
use drygully_core::io::read_geotiff;
use drygully_core::raster::{Extent, Raster};
use drygully_core::{Error, Projection, CRS};
use geo::{Coord, Geometry, MapCoords, MultiLineString, MultiPolygon};
use tracing::{debug, info};

/// Derive D8 flow direction and slope (degrees) from a DEM.
///
/// The DEM is depression-filled before flow routing; slope is taken from
/// the unfilled surface. Geographic DEMs are scaled to metres per axis.
pub fn condition(dem: &Raster<f64>) -> Result<(Raster<u8>, Raster<f64>)> {
    let (x_scale, y_scale) = ground_scale(dem);
    debug!("ground scale: {:.3} x {:.3} m per unit", x_scale, y_scale);

    let filled = priority_flood(dem, PriorityFloodParams::default())?;
    let fdir = flow_direction(&filled, FlowDirectionParams { x_scale, y_scale })?;
    let slope = slope(
        dem,
        SlopeParams {
            units: SlopeUnits::Degrees,
            x_scale,
            y_scale,
        },
    )?;
    Ok((fdir, slope))
}

/// Engine holding every raster in memory
#[derive(Debug, Clone)]
pub struct NativeEngine {
    dem: Raster<f64>,
    flow_dir: Raster<u8>,
    slope: Raster<f64>,
    source: CRS,
    projected: CRS,
    projection: Projection,
}

impl NativeEngine {
    /// Build an engine from aligned rasters.
    ///
    /// `source` is used when the DEM carries no CRS of its own.
    pub fn new(
        dem: Raster<f64>,
        flow_dir: Raster<u8>,
        slope: Raster<f64>,
        source: CRS,
        projected: CRS,
    ) -> Result<Self> {
        let (er, ec) = dem.shape();
        for (ar, ac) in [flow_dir.shape(), slope.shape()] {
            if (ar, ac) != (er, ec) {
                return Err(Error::SizeMismatch { er, ec, ar, ac }.into());
            }
        }

        let source = dem.crs().copied().unwrap_or(source);
        if !source.is_geographic() {
            return Err(SiteError::Config(format!("DEM CRS {} is not geographic", source)));
        }
        let projection = projected.projection()?;

        let mut dem = dem;
        dem.set_crs(Some(source));
        Ok(Self {
            dem,
            flow_dir,
            slope,
            source,
            projected,
            projection,
        })
    }

    /// Build an engine from a DEM alone, deriving flow direction and slope
    pub fn from_dem(dem: Raster<f64>, source: CRS, projected: CRS) -> Result<Self> {
        let (flow_dir, slope) = condition(&dem)?;
        Self::new(dem, flow_dir, slope, source, projected)
    }

    /// Engine over a DEM alone. Every cell is a pit with zero slope, so
    /// only elevation queries and geometry work are meaningful.
    pub fn with_dem(dem: Raster<f64>, source: CRS, projected: CRS) -> Result<Self> {
        let (rows, cols) = dem.shape();
        let mut flow_dir = dem.with_same_meta::<u8>(rows, cols);
        flow_dir.set_nodata(Some(0));
        let slope = dem.with_same_meta::<f64>(rows, cols);
        Self::new(dem, flow_dir, slope, source, projected)
    }

    /// Engine without rasters, for the geometry-only stages. Raster queries
    /// find no cells.
    pub fn vector_only(source: CRS, projected: CRS) -> Result<Self> {
        Self::with_dem(Raster::new(0, 0), source, projected)
    }

    /// Read the configured rasters, deriving whichever of flow direction
    /// and slope is missing
    pub fn open(inputs: &InputPaths, crs: &CrsConfig) -> Result<Self> {
        let dem_path = inputs
            .dem
            .as_ref()
            .ok_or_else(|| SiteError::Config("no DEM given in [inputs]".into()))?;
        let dem: Raster<f64> = read_geotiff(dem_path)?;
        info!("DEM: {} x {}", dem.cols(), dem.rows());

        let (flow_dir, slope) = match (&inputs.flow_direction, &inputs.slope) {
            (Some(f), Some(s)) => (read_geotiff(f)?, read_geotiff(s)?),
            (fdir_path, slope_path) => {
                info!("Conditioning DEM");
                let (derived_fdir, derived_slope) = condition(&dem)?;
                let fdir = match fdir_path {
                    Some(f) => read_geotiff(f)?,
                    None => derived_fdir,
                };
                let slope = match slope_path {
                    Some(s) => read_geotiff(s)?,
                    None => derived_slope,
                };
                (fdir, slope)
            }
        };

        Self::new(dem, flow_dir, slope, crs.source(), crs.projected())
    }

    pub fn dem(&self) -> &Raster<f64> {
        &self.dem
    }

    pub fn flow_direction(&self) -> &Raster<u8> {
        &self.flow_dir
    }

    pub fn slope(&self) -> &Raster<f64> {
        &self.slope
    }

    fn layer(&self, layer: Layer) -> &Raster<f64> {
        match layer {
            Layer::Elevation => &self.dem,
            Layer::Slope => &self.slope,
        }
    }

}

impl RasterVectorEngine for NativeEngine {
    fn source_crs(&self) -> CRS {
        self.source
    }

    fn projected_crs(&self) -> CRS {
        self.projected
    }

    fn watershed(&self, x: f64, y: f64, extent: &Extent) -> Result<Option<Raster<u8>>> {
        let fdir = match self.flow_dir.window(extent) {
            Ok((window, _)) => window,
            Err(Error::EmptyWindow(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let Some(pour) = fdir.cell_at(x, y) else {
            return Ok(None);
        };

        let labels = watershed(&fdir, WatershedParams { pour_points: vec![pour] })?;
        let (rows, cols) = labels.shape();
        let mut mask = labels.with_same_meta::<u8>(rows, cols);
        mask.set_nodata(Some(0));
        *mask.data_mut() = labels.data().mapv(|label| u8::from(label == 1));
        Ok(Some(mask))
    }

    fn window(&self, layer: Layer, extent: &Extent) -> Result<Raster<f64>> {
        Ok(self.layer(layer).window(extent)?.0)
    }

    fn extract_by_mask(&self, layer: Layer, mask: &Raster<u8>, extent: &Extent) -> Result<Raster<f64>> {
        let values = self.window(layer, extent)?;
        Ok(extract_by_mask(&values, mask)?)
    }

    fn focal_statistics(&self, layer: Layer, extent: &Extent, params: FocalParams) -> Result<Raster<f64>> {
        let values = self.window(layer, extent)?;
        Ok(focal_statistics(&values, params)?)
    }

    fn summarize_polygons(
        &self,
        layer: Layer,
        polygons: &MultiPolygon<f64>,
        extent: &Extent,
    ) -> Result<Option<CellSummary>> {
        let values = self.window(layer, extent)?;
        let cells = cells_in_polygons(&values, polygons);
        Ok(cell_summary(&values, &cells))
    }

    fn summarize_lines(&self, layer: Layer, lines: &MultiLineString<f64>, extent: &Extent) -> Result<Option<CellSummary>> {
        let values = self.window(layer, extent)?;
        let cells = cells_along_lines(&values, lines);
        Ok(cell_summary(&values, &cells))
    }

    fn project(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        let projection = &self.projection;
        Ok(geometry.map_coords(|c| {
            let (x, y) = projection.forward(c.x, c.y);
            Coord { x, y }
        }))
    }

    fn unproject(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        let projection = &self.projection;
        Ok(geometry.map_coords(|c| {
            let (x, y) = projection.inverse(c.x, c.y);
            Coord { x, y }
        }))
    }
}
