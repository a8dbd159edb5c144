//! Raster to polygon conversion
//!
//! Each 4-connected region of "inside" cells becomes one polygon whose rings
//! follow cell edges. Holes are kept. Collinear vertices are dropped, no
//! other simplification is applied.

use drygully_core::raster::{Raster, RasterElement};
use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, Coord, LineString, Polygon};
use std::collections::{HashMap, VecDeque};

type Corner = (i64, i64);

/// Polygonize the cells of `mask` holding valid, non-zero data.
///
/// Polygons are returned in scan order of their first (top-left) cell,
/// exteriors counter-clockwise and holes clockwise, in map coordinates.
pub fn polygonize<T: RasterElement>(mask: &Raster<T>) -> Vec<Polygon<f64>> {
    let (rows, cols) = mask.shape();
    let inside = |r: usize, c: usize| {
        let v = unsafe { mask.get_unchecked(r, c) };
        !mask.is_nodata(v) && v != T::zero()
    };

    let mut label = vec![0usize; rows * cols];
    let mut polygons = Vec::new();
    let mut next_label = 0usize;

    for row in 0..rows {
        for col in 0..cols {
            if label[row * cols + col] != 0 || !inside(row, col) {
                continue;
            }
            next_label += 1;
            let cells = flood_component(row, col, rows, cols, next_label, &mut label, &inside);

            let edges = boundary_edges(&cells, rows, cols, next_label, &label);
            let rings = trace_rings(edges);
            if let Some(polygon) = assemble(rings, mask) {
                polygons.push(polygon);
            }
        }
    }

    polygons
}

fn flood_component(
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
    id: usize,
    label: &mut [usize],
    inside: &impl Fn(usize, usize) -> bool,
) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    let mut queue = VecDeque::from([(row, col)]);
    label[row * cols + col] = id;

    while let Some((r, c)) = queue.pop_front() {
        cells.push((r, c));
        let neighbors = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];
        for (nr, nc) in neighbors {
            if nr < rows && nc < cols && label[nr * cols + nc] == 0 && inside(nr, nc) {
                label[nr * cols + nc] = id;
                queue.push_back((nr, nc));
            }
        }
    }
    cells
}

/// Directed cell edges between the region and everything else, in corner
/// coordinates `(col, row)`, running clockwise on screen around the region
fn boundary_edges(
    cells: &[(usize, usize)],
    rows: usize,
    cols: usize,
    id: usize,
    label: &[usize],
) -> Vec<(Corner, Corner)> {
    let same = |r: i64, c: i64| {
        r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols && label[r as usize * cols + c as usize] == id
    };

    let mut edges = Vec::new();
    for &(r, c) in cells {
        let (r, c) = (r as i64, c as i64);
        if !same(r - 1, c) {
            edges.push(((c, r), (c + 1, r)));
        }
        if !same(r, c + 1) {
            edges.push(((c + 1, r), (c + 1, r + 1)));
        }
        if !same(r + 1, c) {
            edges.push(((c + 1, r + 1), (c, r + 1)));
        }
        if !same(r, c - 1) {
            edges.push(((c, r + 1), (c, r)));
        }
    }
    edges
}

/// Chain directed edges into closed rings.
///
/// Where the region pinches at a corner the walk turns away from the region
/// (left on screen), so a hole touching the outline at one corner stays a
/// separate ring.
fn trace_rings(edges: Vec<(Corner, Corner)>) -> Vec<Vec<Corner>> {
    let mut outgoing: HashMap<Corner, Vec<usize>> = HashMap::new();
    for (i, (start, _)) in edges.iter().enumerate() {
        outgoing.entry(*start).or_default().push(i);
    }
    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let origin = edges[first].0;
        let mut ring = vec![origin];
        let (mut from, mut at) = edges[first];

        while at != origin {
            ring.push(at);
            let dir = (at.0 - from.0, at.1 - from.1);
            let prefs = [(dir.1, -dir.0), dir, (-dir.1, dir.0)];

            let candidates = outgoing.get(&at).map(Vec::as_slice).unwrap_or(&[]);
            let next = prefs.iter().find_map(|want| {
                candidates.iter().copied().find(|&e| {
                    let (s, t) = edges[e];
                    !used[e] && (t.0 - s.0, t.1 - s.1) == *want
                })
            });
            let Some(e) = next else {
                break;
            };
            used[e] = true;
            from = at;
            at = edges[e].1;
        }

        ring.push(origin);
        rings.push(remove_collinear(ring));
    }

    rings
}

fn remove_collinear(ring: Vec<Corner>) -> Vec<Corner> {
    // ring is closed: first == last
    let n = ring.len() - 1;
    if n < 4 {
        return ring;
    }
    let turns = |i: usize| {
        let prev = ring[(i + n - 1) % n];
        let cur = ring[i];
        let next = ring[(i + 1) % n];
        let a = (cur.0 - prev.0, cur.1 - prev.1);
        let b = (next.0 - cur.0, next.1 - cur.1);
        a.0 * b.1 - a.1 * b.0 != 0
    };
    let mut out: Vec<Corner> = (0..n).filter(|&i| turns(i)).map(|i| ring[i]).collect();
    if let Some(&first) = out.first() {
        out.push(first);
    }
    out
}

fn assemble<T: RasterElement>(rings: Vec<Vec<Corner>>, mask: &Raster<T>) -> Option<Polygon<f64>> {
    let gt = mask.transform();
    let mut rings: Vec<LineString<f64>> = rings
        .into_iter()
        .filter(|r| r.len() >= 4)
        .map(|r| {
            r.into_iter()
                .map(|(c, r)| {
                    let (x, y) = gt.pixel_to_geo_corner(c as usize, r as usize);
                    Coord { x, y }
                })
                .collect()
        })
        .collect();

    let outer = rings
        .iter()
        .enumerate()
        .map(|(i, r)| (i, Polygon::new(r.clone(), vec![]).unsigned_area()))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)?;
    let exterior = rings.swap_remove(outer);

    Some(Polygon::new(exterior, rings).orient(Direction::Default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drygully_core::GeoTransform;

    fn mask(rows: usize, cols: usize, cells: &[u8]) -> Raster<u8> {
        let mut r = Raster::from_vec(cells.to_vec(), rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_rectangle() {
        let m = mask(3, 4, &[0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1, 0]);
        let polys = polygonize(&m);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].unsigned_area(), 4.0);
        // Collinear corners dropped: 4 vertices + closing
        assert_eq!(polys[0].exterior().0.len(), 5);
        assert!(polys[0].signed_area() > 0.0);
    }

    #[test]
    fn test_hole_is_kept() {
        #[rustfmt::skip]
        let m = mask(3, 3, &[
            1, 1, 1,
            1, 0, 1,
            1, 1, 1,
        ]);
        let polys = polygonize(&m);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].interiors().len(), 1);
        assert_eq!(polys[0].unsigned_area(), 8.0);
    }

    #[test]
    fn test_diagonal_cells_are_separate() {
        #[rustfmt::skip]
        let m = mask(2, 2, &[
            1, 0,
            0, 1,
        ]);
        let polys = polygonize(&m);
        assert_eq!(polys.len(), 2);
        assert!(polys.iter().all(|p| p.unsigned_area() == 1.0 && p.interiors().is_empty()));
    }

    #[test]
    fn test_diagonal_pinch_inside_one_region() {
        // Ring of cells with the hole touching a corner of the region diagonally
        #[rustfmt::skip]
        let m = mask(3, 3, &[
            1, 1, 0,
            1, 0, 1,
            1, 1, 1,
        ]);
        let polys = polygonize(&m);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].interiors().len(), 1);
        assert_eq!(polys[0].unsigned_area(), 7.0);
    }

    #[test]
    fn test_nodata_is_outside() {
        let mut m = mask(1, 3, &[1, 255, 1]);
        m.set_nodata(Some(255));
        assert_eq!(polygonize(&m).len(), 2);
    }

    #[test]
    fn test_map_coordinates() {
        let mut m = mask(2, 2, &[1, 1, 1, 1]);
        m.set_transform(GeoTransform::new(138.0, -33.0, 0.5, -0.5));
        let polys = polygonize(&m);
        let xs: Vec<f64> = polys[0].exterior().coords().map(|c| c.x).collect();
        let ys: Vec<f64> = polys[0].exterior().coords().map(|c| c.y).collect();
        assert_eq!(xs.iter().cloned().fold(f64::INFINITY, f64::min), 138.0);
        assert_eq!(xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 139.0);
        assert_eq!(ys.iter().cloned().fold(f64::INFINITY, f64::min), -34.0);
    }
}
