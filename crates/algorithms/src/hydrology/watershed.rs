//! Watershed delineation from pour points
//!
//! Traces upstream from each pour point over a D8 flow direction raster:
//! a neighbor belongs to the catchment when its direction code points back
//! at a cell already in it.

use super::{neighbor, opposite_dir, D8_OFFSETS};
use drygully_core::raster::Raster;
use drygully_core::Result;
use ndarray::Array2;
use std::collections::VecDeque;

/// Parameters for watershed delineation
#[derive(Debug, Clone, Default)]
pub struct WatershedParams {
    /// Pour points as `(row, col)`; basin ids are 1-based positions in
    /// this list
    pub pour_points: Vec<(usize, usize)>,
}

/// Label the catchment of each pour point.
///
/// Cells upstream of the i-th pour point get label `i + 1`; everything else
/// is 0 (the no-data value). Pour points outside the grid are ignored. When
/// catchments nest, the cells go to whichever basin reaches them first.
pub fn watershed(flow_dir: &Raster<u8>, params: WatershedParams) -> Result<Raster<i32>> {
    let (rows, cols) = flow_dir.shape();
    let mut basins = Array2::<i32>::zeros((rows, cols));
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for (id, &(row, col)) in params.pour_points.iter().enumerate() {
        if row < rows && col < cols && basins[(row, col)] == 0 {
            basins[(row, col)] = (id + 1) as i32;
            queue.push_back((row, col));
        }
    }

    while let Some((row, col)) = queue.pop_front() {
        let basin_id = basins[(row, col)];

        for idx in 0..D8_OFFSETS.len() {
            let Some((nr, nc)) = neighbor(row, col, idx, rows, cols) else {
                continue;
            };
            if basins[(nr, nc)] != 0 {
                continue;
            }
            let dir = unsafe { flow_dir.get_unchecked(nr, nc) };
            if dir != 0 && dir == opposite_dir((idx + 1) as u8) {
                basins[(nr, nc)] = basin_id;
                queue.push_back((nr, nc));
            }
        }
    }

    let mut output = flow_dir.with_same_meta::<i32>(rows, cols);
    output.set_nodata(Some(0));
    *output.data_mut() = basins;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::{flow_direction, FlowDirectionParams};
    use drygully_core::GeoTransform;

    fn dem(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
        let mut dem = Raster::new(rows, cols);
        dem.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for row in 0..rows {
            for col in 0..cols {
                dem.set(row, col, f(row, col)).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_pour_point_collects_upstream() {
        // Valley along col 2 draining south
        let d = dem(5, 5, |r, c| (5 - r) as f64 * 10.0 + (c as f64 - 2.0).abs() * 5.0);
        let fdir = flow_direction(&d, FlowDirectionParams::default()).unwrap();
        let basins = watershed(
            &fdir,
            WatershedParams {
                pour_points: vec![(4, 2)],
            },
        )
        .unwrap();

        assert_eq!(basins.get(4, 2).unwrap(), 1);
        assert_eq!(basins.get(0, 2).unwrap(), 1);
        assert_eq!(basins.get(1, 0).unwrap(), 1);
    }

    #[test]
    fn test_ridge_splits_catchments() {
        let d = dem(5, 7, |_, c| 10.0 - (c as f64 - 3.0).abs());
        let fdir = flow_direction(&d, FlowDirectionParams::default()).unwrap();
        let basins = watershed(
            &fdir,
            WatershedParams {
                pour_points: vec![(2, 0), (2, 6)],
            },
        )
        .unwrap();

        assert_eq!(basins.get(2, 1).unwrap(), 1);
        assert_eq!(basins.get(2, 5).unwrap(), 2);
        assert_eq!(basins.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_outside_pour_point_ignored() {
        let fdir: Raster<u8> = Raster::filled(3, 3, 1);
        let basins = watershed(
            &fdir,
            WatershedParams {
                pour_points: vec![(7, 7)],
            },
        )
        .unwrap();
        assert!(basins.data().iter().all(|&b| b == 0));
    }
}
