//! Priority-Flood depression filling
//!
//! Cells are processed in elevation order from a min-heap seeded with the
//! DEM boundary (and every cell bordering no-data), so each cell is visited
//! exactly once.
//!
//! Reference:
//! Barnes, R., Lehman, C., & Mulla, D. (2014). Priority-Flood: An optimal
//! depression-filling and watershed-labeling algorithm for digital elevation
//! models. *Computers & Geosciences*, 62, 117–127.

use super::{neighbor, D8_OFFSETS};
use drygully_core::raster::Raster;
use drygully_core::{Error, Result};
use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct Cell {
    elevation: f64,
    row: usize,
    col: usize,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    // Reversed so BinaryHeap pops the lowest cell first
    fn cmp(&self, other: &Self) -> Ordering {
        other.elevation.total_cmp(&self.elevation)
    }
}

/// Parameters for Priority-Flood filling
#[derive(Debug, Clone)]
pub struct PriorityFloodParams {
    /// Minimum rise enforced from a cell to the cells it drains.
    /// A small positive value keeps filled flats draining for D8.
    pub epsilon: f64,
}

impl Default for PriorityFloodParams {
    fn default() -> Self {
        Self { epsilon: 1e-5 }
    }
}

/// Fill depressions in a DEM so that every valid cell drains to the
/// grid edge or to a no-data cell.
///
/// No-data cells are preserved as-is. Filled elevations are never lower
/// than the input.
pub fn priority_flood(dem: &Raster<f64>, params: PriorityFloodParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let epsilon = params.epsilon;
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(Error::InvalidParameter {
            name: "epsilon",
            value: epsilon.to_string(),
            reason: "must be a finite, non-negative value".into(),
        });
    }

    let mut output = Array2::<f64>::from_elem((rows, cols), f64::NAN);
    let mut closed = Array2::<bool>::from_elem((rows, cols), false);
    let mut heap = BinaryHeap::new();

    let valid = |r: usize, c: usize| {
        let v = unsafe { dem.get_unchecked(r, c) };
        (!dem.is_nodata(v)).then_some(v)
    };

    // Seed with edge cells and cells touching no-data
    for row in 0..rows {
        for col in 0..cols {
            let Some(z) = valid(row, col) else {
                closed[(row, col)] = true;
                output[(row, col)] = unsafe { dem.get_unchecked(row, col) };
                continue;
            };
            let on_edge = row == 0 || row == rows - 1 || col == 0 || col == cols - 1;
            let by_void = (0..D8_OFFSETS.len())
                .filter_map(|i| neighbor(row, col, i, rows, cols))
                .any(|(nr, nc)| valid(nr, nc).is_none());
            if on_edge || by_void {
                closed[(row, col)] = true;
                output[(row, col)] = z;
                heap.push(Cell { elevation: z, row, col });
            }
        }
    }

    let mut raised = 0usize;
    while let Some(cell) = heap.pop() {
        for idx in 0..D8_OFFSETS.len() {
            let Some((nr, nc)) = neighbor(cell.row, cell.col, idx, rows, cols) else {
                continue;
            };
            if closed[(nr, nc)] {
                continue;
            }
            closed[(nr, nc)] = true;

            // Unvisited cells are always valid: no-data was closed while seeding
            let z = unsafe { dem.get_unchecked(nr, nc) };
            let filled = z.max(cell.elevation + epsilon);
            if filled > z {
                raised += 1;
            }
            output[(nr, nc)] = filled;
            heap.push(Cell {
                elevation: filled,
                row: nr,
                col: nc,
            });
        }
    }

    tracing::debug!(rows, cols, raised, "priority-flood fill complete");

    let mut result = dem.with_same_meta::<f64>(rows, cols);
    result.set_nodata(dem.nodata());
    *result.data_mut() = output;
    Ok(result)
}
