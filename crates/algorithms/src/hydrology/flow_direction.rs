//! D8 flow direction
//!
//! Each cell drains to the neighbor with the steepest downhill gradient.
//! Horizontal and vertical cell spacing are handled separately so that
//! geographic grids (degrees) can be scaled to metres per axis.

use super::{neighbor, D8_OFFSETS};
use crate::maybe_rayon::*;
use drygully_core::raster::Raster;
use drygully_core::{Error, Result};
use ndarray::Array2;

/// Parameters for D8 flow direction
#[derive(Debug, Clone)]
pub struct FlowDirectionParams {
    /// Multiplier turning the cell width into ground distance
    pub x_scale: f64,
    /// Multiplier turning the cell height into ground distance
    pub y_scale: f64,
}

impl Default for FlowDirectionParams {
    fn default() -> Self {
        Self {
            x_scale: 1.0,
            y_scale: 1.0,
        }
    }
}

/// Calculate D8 flow direction codes from a (preferably filled) DEM.
///
/// Returns `Raster<u8>` with codes 1-8, or 0 for pits, flats and no-data.
pub fn flow_direction(dem: &Raster<f64>, params: FlowDirectionParams) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let gt = dem.transform();
    let dx = gt.pixel_width.abs() * params.x_scale;
    let dy = gt.pixel_height.abs() * params.y_scale;
    if !(dx > 0.0 && dy > 0.0) {
        return Err(Error::Algorithm(format!(
            "Flow direction needs positive cell spacing, got {} x {}",
            dx, dy
        )));
    }
    let diagonal = dx.hypot(dy);
    let distances: Vec<f64> = D8_OFFSETS
        .iter()
        .map(|&(dr, dc)| match (dr != 0, dc != 0) {
            (true, true) => diagonal,
            (true, false) => dy,
            _ => dx,
        })
        .collect();

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];

            for (col, code) in row_data.iter_mut().enumerate() {
                let center = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(center) {
                    continue;
                }

                let mut max_drop = 0.0_f64;
                for (idx, distance) in distances.iter().enumerate() {
                    let Some((nr, nc)) = neighbor(row, col, idx, rows, cols) else {
                        continue;
                    };
                    let z = unsafe { dem.get_unchecked(nr, nc) };
                    if dem.is_nodata(z) {
                        continue;
                    }
                    let drop = (center - z) / distance;
                    if drop > max_drop {
                        max_drop = drop;
                        *code = (idx + 1) as u8;
                    }
                }
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(0));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drygully_core::GeoTransform;

    fn plane(f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
        let mut dem = Raster::new(5, 5);
        dem.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        for row in 0..5 {
            for col in 0..5 {
                dem.set(row, col, f(row, col)).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_slope_east() {
        let dem = plane(|_, c| (5 - c) as f64 * 10.0);
        let fdir = flow_direction(&dem, FlowDirectionParams::default()).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 1);
    }

    #[test]
    fn test_slope_south() {
        let dem = plane(|r, _| (5 - r) as f64 * 10.0);
        let fdir = flow_direction(&dem, FlowDirectionParams::default()).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 7);
    }

    #[test]
    fn test_diagonal() {
        let dem = plane(|r, c| (10 - r - c) as f64 * 10.0);
        let fdir = flow_direction(&dem, FlowDirectionParams::default()).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 8);
    }

    #[test]
    fn test_pit() {
        let mut dem = plane(|_, _| 10.0);
        dem.set(2, 2, 1.0).unwrap();
        let fdir = flow_direction(&dem, FlowDirectionParams::default()).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 0);
        assert_eq!(fdir.get(1, 1).unwrap(), 8);
    }

    #[test]
    fn test_anisotropic_spacing_changes_choice() {
        // Drops: 3 m to the east, 2 m to the south
        let dem = plane(|r, c| 100.0 - 3.0 * c as f64 - 2.0 * r as f64);
        let square = flow_direction(&dem, FlowDirectionParams::default()).unwrap();
        assert_eq!(square.get(2, 2).unwrap(), 8);

        // Columns five times wider than rows: south becomes steepest
        let wide = flow_direction(
            &dem,
            FlowDirectionParams {
                x_scale: 5.0,
                y_scale: 1.0,
            },
        )
        .unwrap();
        assert_eq!(wide.get(2, 2).unwrap(), 7);
    }
}
