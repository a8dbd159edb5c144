//! Polygon smoothing by weighted averaging along the ring
//!
//! Rings are densified, then every vertex is replaced by a Gaussian-weighted
//! average of its neighbours within half the tolerance of arc length on each
//! side. This rounds the staircase of polygonized cells while keeping the
//! enclosed area close to the original.

use geo::{Coord, Densify, Euclidean, Length, LineString, MultiPolygon, Polygon};

/// Upper bound on vertices produced when densifying one ring
const MAX_RING_VERTICES: usize = 5000;

/// Smooth one closed ring with a Gaussian kernel of the given tolerance.
///
/// Rings whose perimeter is not longer than `tolerance` come back unchanged.
pub fn smooth_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    if tolerance <= 0.0 || ring.0.len() < 4 {
        return ring.clone();
    }
    let perimeter = ring.length::<Euclidean>();
    if perimeter <= tolerance {
        return ring.clone();
    }

    let step = (tolerance / 10.0).max(perimeter / MAX_RING_VERTICES as f64);
    let dense = ring.densify::<Euclidean>(step);

    // Cumulative arc length at each vertex; the closing vertex is dropped
    let mut arc = vec![0.0];
    for seg in dense.lines() {
        let last = arc[arc.len() - 1];
        arc.push(last + seg.length::<Euclidean>());
    }
    let mut pts = dense.0;
    pts.pop();
    arc.pop();
    let n = pts.len();

    let half = tolerance / 2.0;
    let sigma = tolerance / 4.0;
    let weight = |d: f64| (-0.5 * (d / sigma).powi(2)).exp();

    let mut smoothed: Vec<Coord<f64>> = (0..n)
        .map(|i| {
            let (mut sx, mut sy, mut sw) = (pts[i].x, pts[i].y, 1.0);
            // Walk both directions until the window is exhausted
            for dir in [1isize, -1] {
                for k in 1..n {
                    let j = (i as isize + dir * k as isize).rem_euclid(n as isize) as usize;
                    let raw = (arc[j] - arc[i]) * dir as f64;
                    let d = if raw < 0.0 { raw + perimeter } else { raw };
                    if d > half {
                        break;
                    }
                    let w = weight(d);
                    sx += pts[j].x * w;
                    sy += pts[j].y * w;
                    sw += w;
                }
            }
            Coord { x: sx / sw, y: sy / sw }
        })
        .collect();

    smoothed.push(smoothed[0]);
    LineString::new(smoothed)
}

pub fn smooth_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    Polygon::new(
        smooth_ring(polygon.exterior(), tolerance),
        polygon.interiors().iter().map(|r| smooth_ring(r, tolerance)).collect(),
    )
}

pub fn smooth_multipolygon(polygons: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(polygons.0.iter().map(|p| smooth_polygon(p, tolerance)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn staircase() -> Polygon<f64> {
        // 30 m cells, a 10 x 10 block with a stepped corner removed
        let mut coords = vec![(0.0, 0.0), (300.0, 0.0), (300.0, 150.0)];
        for k in 0..5 {
            let x = 300.0 - 30.0 * k as f64;
            let y = 150.0 + 30.0 * k as f64;
            coords.push((x - 30.0, y));
            coords.push((x - 30.0, y + 30.0));
        }
        coords.push((0.0, 300.0));
        coords.push((0.0, 0.0));
        Polygon::new(LineString::from(coords), vec![])
    }

    #[test]
    fn test_area_roughly_preserved() {
        let poly = staircase();
        let smoothed = smooth_polygon(&poly, 90.0);
        let before = poly.unsigned_area();
        let after = smoothed.unsigned_area();
        assert!(((after - before) / before).abs() < 0.03, "{before} -> {after}");
    }

    #[test]
    fn test_ring_closed_and_denser() {
        let poly = staircase();
        let smoothed = smooth_polygon(&poly, 90.0);
        let ring = smoothed.exterior();
        assert!(ring.is_closed());
        assert!(ring.0.len() > poly.exterior().0.len());
    }

    #[test]
    fn test_long_ring_vertex_cap() {
        let side = 1.0e6;
        let big = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (side, 0.0), (side, side), (0.0, side), (0.0, 0.0)]),
            vec![],
        );
        let smoothed = smooth_polygon(&big, 90.0);
        let ring = smoothed.exterior();
        assert!(ring.is_closed());
        assert!(ring.0.len() <= MAX_RING_VERTICES + 5, "{}", ring.0.len());
        // Straight edges stay put away from the corners
        let mid = ring.0.iter().find(|c| c.y == 0.0 && (c.x - side / 2.0).abs() < 1e3);
        assert!(mid.is_some());
    }

    #[test]
    fn test_small_ring_unchanged() {
        let tiny = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        );
        assert_eq!(smooth_polygon(&tiny, 90.0), tiny);
        assert_eq!(smooth_polygon(&tiny, 0.0), tiny);
    }
}
