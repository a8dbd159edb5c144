//! Slope calculation from DEMs
//!
//! Horn (1981) 3x3 finite differences, with separate horizontal and
//! vertical cell spacing.

use crate::maybe_rayon::*;
use drygully_core::raster::Raster;
use drygully_core::{Error, Result};
use ndarray::Array2;

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    #[default]
    Degrees,
    Percent,
    Radians,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    pub units: SlopeUnits,
    /// Multiplier turning the cell width into elevation units
    /// (metres per degree of longitude for geographic DEMs)
    pub x_scale: f64,
    /// Multiplier turning the cell height into elevation units
    pub y_scale: f64,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            x_scale: 1.0,
            y_scale: 1.0,
        }
    }
}

/// Calculate slope from a DEM.
///
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * dx)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * dy)
///
/// Edge cells and cells with a no-data neighbor are NaN.
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let gt = dem.transform();
    let eight_dx = 8.0 * gt.pixel_width.abs() * params.x_scale;
    let eight_dy = 8.0 * gt.pixel_height.abs() * params.y_scale;
    if !(eight_dx > 0.0 && eight_dy > 0.0) {
        return Err(Error::Algorithm("Slope needs positive cell spacing".into()));
    }

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            if row == 0 || row + 1 >= rows {
                return row_data;
            }

            for col in 1..cols.saturating_sub(1) {
                let at = |r: usize, c: usize| unsafe { dem.get_unchecked(r, c) };
                let window = [
                    at(row - 1, col - 1),
                    at(row - 1, col),
                    at(row - 1, col + 1),
                    at(row, col - 1),
                    at(row, col),
                    at(row, col + 1),
                    at(row + 1, col - 1),
                    at(row + 1, col),
                    at(row + 1, col + 1),
                ];
                if window.iter().any(|&v| dem.is_nodata(v)) {
                    continue;
                }
                let [a, b, c, d, _, f, g, h, i] = window;

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_dx;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_dy;
                let slope_rad = dz_dx.hypot(dz_dy).atan();

                row_data[col] = match params.units {
                    SlopeUnits::Degrees => slope_rad.to_degrees(),
                    SlopeUnits::Percent => slope_rad.tan() * 100.0,
                    SlopeUnits::Radians => slope_rad,
                };
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
