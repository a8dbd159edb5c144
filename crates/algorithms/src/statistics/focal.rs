//! Focal (moving window) statistics
//!
//! Square or circular windows; no-data cells inside the window are skipped,
//! and a cell whose window holds no valid value is NaN.

use crate::maybe_rayon::*;
use drygully_core::raster::Raster;
use drygully_core::{Error, Result};
use ndarray::Array2;

/// Available focal statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocalStatistic {
    Min,
    Max,
}

/// Parameters for focal statistics
#[derive(Debug, Clone)]
pub struct FocalParams {
    /// Window radius in cells (window size = 2 * radius + 1)
    pub radius: usize,
    pub statistic: FocalStatistic,
    /// Keep only offsets within `radius` of the center
    pub circular: bool,
}

impl Default for FocalParams {
    fn default() -> Self {
        Self {
            radius: 1,
            statistic: FocalStatistic::Min,
            circular: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    min: f64,
    max: f64,
    count: usize,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
        }
    }

    fn push(&mut self, v: f64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.count += 1;
    }

    fn finish(&self, stat: FocalStatistic) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        match stat {
            FocalStatistic::Min => self.min,
            FocalStatistic::Max => self.max,
        }
    }
}

/// Window offsets `(dr, dc)` for a radius
fn window_offsets(radius: usize, circular: bool) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let r_sq = r * r;
    let mut offsets = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for dr in -r..=r {
        for dc in -r..=r {
            if !circular || dr * dr + dc * dc <= r_sq {
                offsets.push((dr, dc));
            }
        }
    }
    offsets
}

/// Compute a focal statistic for every cell of a raster
pub fn focal_statistics(raster: &Raster<f64>, params: FocalParams) -> Result<Raster<f64>> {
    if params.radius == 0 {
        return Err(Error::Algorithm("Focal radius must be > 0".into()));
    }

    let (rows, cols) = raster.shape();
    let offsets = window_offsets(params.radius, params.circular);

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let mut acc = Accumulator::new();
                for &(dr, dc) in &offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                        continue;
                    }
                    let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                    if !raster.is_nodata(v) {
                        acc.push(v);
                    }
                }
                *out = acc.finish(params.statistic);
            }

            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
