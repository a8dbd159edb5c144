//! Summary statistics over an explicit set of cells

use drygully_core::raster::Raster;

/// Summary of the valid values found at a set of cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summarize `values` at the listed `(row, col)` cells.
///
/// Cells outside the grid or holding no-data are ignored. Returns `None`
/// when no valid cell remains.
pub fn cell_summary(values: &Raster<f64>, cells: &[(usize, usize)]) -> Option<CellSummary> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for &(row, col) in cells {
        let Ok(v) = values.get(row, col) else {
            continue;
        };
        if values.is_nodata(v) {
            continue;
        }
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    (count > 0).then(|| CellSummary {
        count,
        min,
        max,
        mean: sum / count as f64,
    })
}
