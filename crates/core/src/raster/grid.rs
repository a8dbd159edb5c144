//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{Extent, GeoTransform, RasterElement};
use ndarray::{s, Array2};

/// A north-up grid of cells with its transform, CRS and no-data value.
///
/// DEMs, slope and flow-direction layers and watershed masks are all
/// `Raster`s sharing one transform.
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Indexed (row, col)
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from existing row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a raster with the same metadata but different data type
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs,
            nodata: None,
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs,
            nodata: self.nodata,
        }
    }

    // Dimensions

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Map extent covered by the raster
    pub fn extent(&self) -> Extent {
        self.transform.extent(self.cols(), self.rows())
    }

    // Coordinate conversion

    /// Convert pixel coordinates to map coordinates (cell center)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Convert map coordinates to fractional pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    /// Cell `(row, col)` containing the map coordinate, if inside the grid
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.geo_to_pixel(x, y);
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    /// Copy the cells that fall inside `extent` into a new raster.
    ///
    /// A cell belongs to the window when its center lies inside the extent.
    /// Returns the window and the `(row, col)` offset of its top-left cell
    /// in this raster.
    pub fn window(&self, extent: &Extent) -> Result<(Raster<T>, (usize, usize))> {
        let (rows, cols) = self.shape();
        let (c0, r0) = self.geo_to_pixel(extent.min_x, extent.max_y);
        let (c1, r1) = self.geo_to_pixel(extent.max_x, extent.min_y);

        let (c_lo, c_hi) = (c0.min(c1), c0.max(c1));
        let (r_lo, r_hi) = (r0.min(r1), r0.max(r1));

        // Cell i has its center at i + 0.5
        let col_start = (c_lo - 0.5).ceil().max(0.0);
        let row_start = (r_lo - 0.5).ceil().max(0.0);
        let col_end = ((c_hi - 0.5).floor() + 1.0).min(cols as f64);
        let row_end = ((r_hi - 0.5).floor() + 1.0).min(rows as f64);

        if !(col_start < col_end && row_start < row_end) {
            return Err(Error::EmptyWindow(extent.to_string()));
        }

        let (row_start, row_end) = (row_start as usize, row_end as usize);
        let (col_start, col_end) = (col_start as usize, col_end as usize);

        let data = self
            .data
            .slice(s![row_start..row_end, col_start..col_end])
            .to_owned();

        let window = Raster {
            data,
            transform: self.transform.shifted(col_start, row_start),
            crs: self.crs,
            nodata: self.nodata,
        };

        Ok((window, (row_start, col_start)))
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells holding valid data
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            min = match min {
                Some(m) if m <= value => Some(m),
                _ => Some(value),
            };
            max = match max {
                Some(m) if m >= value => Some(m),
                _ => Some(value),
            };

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = (count > 0).then(|| sum / count as f64);

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(rows: usize, cols: usize) -> Raster<f64> {
        let mut raster: Raster<f64> = Raster::new(rows, cols);
        raster.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for i in 0..rows {
            for j in 0..cols {
                raster.set(i, j, (i * cols + j) as f64).unwrap();
            }
        }
        raster
    }

    #[test]
    fn test_raster_creation() {
        let raster: Raster<u8> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_statistics() {
        let raster = gradient(10, 10);
        let stats = raster.statistics();
        assert_eq!(stats.min, Some(0.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 100);
        assert!((stats.mean.unwrap() - 49.5).abs() < 1e-12);
    }

    #[test]
    fn test_statistics_skip_nan() {
        let mut raster: Raster<f64> = Raster::filled(3, 3, f64::NAN);
        raster.set(1, 1, 7.0).unwrap();
        let stats = raster.statistics();
        assert_eq!(stats.min, Some(7.0));
        assert_eq!(stats.valid_count, 1);
        assert_eq!(stats.nodata_count, 8);

        let empty: Raster<f64> = Raster::filled(2, 2, f64::NAN);
        assert_eq!(empty.statistics().min, None);
        assert_eq!(empty.statistics().mean, None);
    }

    #[test]
    fn test_cell_at() {
        let raster = gradient(10, 10);
        assert_eq!(raster.cell_at(2.5, 7.5), Some((2, 2)));
        assert_eq!(raster.cell_at(-0.5, 7.5), None);
        assert_eq!(raster.cell_at(2.5, 10.5), None);
    }

    #[test]
    fn test_window_by_cell_centers() {
        let raster = gradient(10, 10);
        // Covers cell centers 2.5..=4.5 in x and rows 3..=5
        let extent = Extent::new(2.2, 4.2, 4.8, 6.8);
        let (win, (r0, c0)) = raster.window(&extent).unwrap();

        assert_eq!((r0, c0), (3, 2));
        assert_eq!(win.shape(), (3, 3));
        assert_eq!(win.get(0, 0).unwrap(), raster.get(3, 2).unwrap());
        let (x, y) = win.pixel_to_geo(0, 0);
        assert_eq!(raster.cell_at(x, y), Some((3, 2)));
    }

    #[test]
    fn test_window_clamped_to_grid() {
        let raster = gradient(10, 10);
        let (win, offset) = raster.window(&Extent::new(-50.0, -50.0, 50.0, 50.0)).unwrap();
        assert_eq!(offset, (0, 0));
        assert_eq!(win.shape(), (10, 10));

        assert!(raster.window(&Extent::new(20.0, 20.0, 30.0, 30.0)).is_err());
    }
}
