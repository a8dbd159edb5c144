//! Raster extraction: keep the cells selected by a mask or a value
//! threshold, and find the cells under polygons and lines.

use drygully_core::raster::{Raster, RasterElement};
use drygully_core::{Error, Result};
use geo::{BoundingRect, Contains, Coord, Euclidean, Length, Line, MultiLineString, MultiPolygon, Point};
use std::collections::BTreeSet;

/// Coordinates within this many cells of a cell edge touch both sides
const EDGE_EPS: f64 = 1e-6;

fn check_same_shape<A: RasterElement, B: RasterElement>(a: &Raster<A>, b: &Raster<B>) -> Result<()> {
    let (er, ec) = a.shape();
    let (ar, ac) = b.shape();
    if (er, ec) != (ar, ac) {
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    Ok(())
}

/// Keep `values` where `mask` holds valid, non-zero data.
pub fn extract_by_mask<M: RasterElement>(values: &Raster<f64>, mask: &Raster<M>) -> Result<Raster<f64>> {
    check_same_shape(values, mask)?;

    let mut output = values.like(f64::NAN);
    output.set_nodata(Some(f64::NAN));
    for ((row, col), &m) in mask.data().indexed_iter() {
        if mask.is_nodata(m) || m == M::zero() {
            continue;
        }
        let v = unsafe { values.get_unchecked(row, col) };
        if !values.is_nodata(v) {
            output.data_mut()[(row, col)] = v;
        }
    }
    Ok(output)
}

/// Keep cells whose value is `<= max_value`.
pub fn extract_at_most(values: &Raster<f64>, max_value: f64) -> Raster<f64> {
    let mut output = values.like(f64::NAN);
    output.set_nodata(Some(f64::NAN));
    for ((row, col), &v) in values.data().indexed_iter() {
        if !values.is_nodata(v) && v <= max_value {
            output.data_mut()[(row, col)] = v;
        }
    }
    output
}

/// Cells `(row, col)` of `template` whose centers lie inside `polygons`.
pub fn cells_in_polygons<T: RasterElement>(
    template: &Raster<T>,
    polygons: &MultiPolygon<f64>,
) -> Vec<(usize, usize)> {
    let Some(bbox) = polygons.bounding_rect() else {
        return Vec::new();
    };
    let (rows, cols) = template.shape();
    let (c0, r0) = template.geo_to_pixel(bbox.min().x, bbox.max().y);
    let (c1, r1) = template.geo_to_pixel(bbox.max().x, bbox.min().y);
    let clamp = |v: f64, n: usize| v.max(0.0).min(n as f64) as usize;
    let (col_lo, col_hi) = (clamp(c0.min(c1).floor(), cols), clamp(c0.max(c1).ceil(), cols));
    let (row_lo, row_hi) = (clamp(r0.min(r1).floor(), rows), clamp(r0.max(r1).ceil(), rows));

    let mut cells = Vec::new();
    for row in row_lo..row_hi {
        for col in col_lo..col_hi {
            let (x, y) = template.pixel_to_geo(col, row);
            if polygons.contains(&Point::new(x, y)) {
                cells.push((row, col));
            }
        }
    }
    cells
}

/// Pixel indices touching a fractional pixel coordinate: the containing
/// index, or both neighbors when the coordinate sits on a cell edge.
fn touching(v: f64) -> [Option<isize>; 2] {
    let nearest = v.round();
    if (v - nearest).abs() < EDGE_EPS {
        let n = nearest as isize;
        [Some(n - 1), Some(n)]
    } else {
        [Some(v.floor() as isize), None]
    }
}

/// Cells touched by a set of lines, in row-major order without duplicates.
///
/// Each segment is split into pieces no longer than one cell and sampled at
/// the middle of every piece. A sample lying on a cell edge touches the
/// cells on both sides of it.
pub fn cells_along_lines<T: RasterElement>(
    template: &Raster<T>,
    lines: &MultiLineString<f64>,
) -> Vec<(usize, usize)> {
    let (rows, cols) = template.shape();
    let mut cells = BTreeSet::new();

    for line in &lines.0 {
        for seg in line.lines() {
            let to_px = |c: Coord<f64>| {
                let (col, row) = template.geo_to_pixel(c.x, c.y);
                Coord { x: col, y: row }
            };
            let (a, b) = (to_px(seg.start), to_px(seg.end));
            let len = Line::new(a, b).length::<Euclidean>();
            if !len.is_finite() {
                continue;
            }
            let pieces = (len.ceil() as usize).max(1);

            for k in 0..pieces {
                let t = (k as f64 + 0.5) / pieces as f64;
                let col = a.x + (b.x - a.x) * t;
                let row = a.y + (b.y - a.y) * t;
                for r in touching(row).into_iter().flatten() {
                    for c in touching(col).into_iter().flatten() {
                        if r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols {
                            cells.insert((r as usize, c as usize));
                        }
                    }
                }
            }
        }
    }

    cells.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use drygully_core::GeoTransform;
    use geo::{LineString, Polygon};

    fn grid(rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::new(rows, cols);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for row in 0..rows {
            for col in 0..cols {
                r.set(row, col, (row * cols + col) as f64).unwrap();
            }
        }
        r
    }

    #[test]
    fn test_extract_by_mask() {
        let values = grid(2, 2);
        let mask = Raster::from_vec(vec![1u8, 0, 0, 1], 2, 2).unwrap();
        let out = extract_by_mask(&values, &mask).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 0.0);
        assert!(out.get(0, 1).unwrap().is_nan());
        assert_eq!(out.get(1, 1).unwrap(), 3.0);

        let wrong: Raster<u8> = Raster::new(3, 2);
        assert!(extract_by_mask(&values, &wrong).is_err());
    }

    #[test]
    fn test_extract_at_most() {
        let out = extract_at_most(&grid(3, 3), 4.0);
        assert_eq!(out.valid_count(), 5);
        assert!(out.get(1, 2).unwrap().is_nan());
    }

    #[test]
    fn test_cells_in_polygon() {
        let r = grid(5, 5);
        // x in [1, 3], y in [1, 3] covers centers of rows 2..=3, cols 1..=2
        let square = Polygon::new(
            LineString::from(vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0), (1.0, 1.0)]),
            vec![],
        );
        let cells = cells_in_polygons(&r, &MultiPolygon::new(vec![square]));
        assert_eq!(cells, vec![(2, 1), (2, 2), (3, 1), (3, 2)]);
    }

    #[test]
    fn test_line_on_edge_touches_both_sides() {
        let r = grid(4, 4);
        // Horizontal line along y = 2 (between rows 1 and 2), x from 0 to 2
        let line = MultiLineString::new(vec![LineString::from(vec![(0.0, 2.0), (2.0, 2.0)])]);
        let cells = cells_along_lines(&r, &line);
        assert_eq!(cells, vec![(1, 0), (1, 1), (2, 0), (2, 1)]);
    }

    #[test]
    fn test_line_on_grid_border_keeps_inside() {
        let r = grid(4, 4);
        let line = MultiLineString::new(vec![LineString::from(vec![(0.0, 4.0), (0.0, 0.0)])]);
        let cells = cells_along_lines(&r, &line);
        assert_eq!(cells, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn test_line_through_cell_interiors() {
        let r = grid(4, 4);
        let line = MultiLineString::new(vec![LineString::from(vec![(0.5, 3.5), (2.5, 3.5)])]);
        assert_eq!(cells_along_lines(&r, &line), vec![(0, 0), (0, 1), (0, 2)]);
    }
}
