//! Polygon overlay: intersection, erase, merge and shared boundaries

use geo::{Area, BooleanOps, Coord, Euclidean, Length, Line, LineString, MultiLineString, MultiPolygon, Polygon};

/// Area-bearing intersection of two polygon sets
pub fn intersect(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    a.intersection(b)
}

/// Part of `a` not covered by `b`
pub fn erase(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    a.difference(b)
}

/// Union of all polygons into one multi-part geometry
pub fn merge<'a>(parts: impl IntoIterator<Item = &'a Polygon<f64>>) -> MultiPolygon<f64> {
    parts
        .into_iter()
        .fold(MultiPolygon::new(vec![]), |acc, p| {
            if acc.0.is_empty() {
                MultiPolygon::new(vec![p.clone()])
            } else {
                acc.union(&MultiPolygon::new(vec![p.clone()]))
            }
        })
}

/// Largest polygon by area; the first one wins ties
pub fn largest_polygon(parts: Vec<Polygon<f64>>) -> Option<Polygon<f64>> {
    let mut best: Option<(f64, Polygon<f64>)> = None;
    for p in parts {
        let a = p.unsigned_area();
        match &best {
            Some((best_area, _)) if *best_area >= a => {}
            _ => best = Some((a, p)),
        }
    }
    best.map(|(_, p)| p)
}

fn rings(p: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(p.exterior()).chain(p.interiors())
}

/// Portion of `seg` that lies on `other`, when the two are collinear
fn collinear_overlap(seg: Line<f64>, other: Line<f64>, tol: f64) -> Option<Line<f64>> {
    let d = seg.delta();
    let len2 = d.x * d.x + d.y * d.y;
    if len2 == 0.0 {
        return None;
    }
    let len = len2.sqrt();
    let off_line = |c: Coord<f64>| ((c.x - seg.start.x) * d.y - (c.y - seg.start.y) * d.x).abs() / len;
    if off_line(other.start) > tol || off_line(other.end) > tol {
        return None;
    }
    let param = |c: Coord<f64>| ((c.x - seg.start.x) * d.x + (c.y - seg.start.y) * d.y) / len2;
    let (t0, t1) = (param(other.start), param(other.end));
    let lo = t0.min(t1).max(0.0);
    let hi = t0.max(t1).min(1.0);
    if (hi - lo) * len <= tol {
        return None;
    }
    let at = |t: f64| Coord {
        x: seg.start.x + d.x * t,
        y: seg.start.y + d.y * t,
    };
    Some(Line::new(at(lo), at(hi)))
}

fn near(a: Coord<f64>, b: Coord<f64>, tol: f64) -> bool {
    Line::new(a, b).length::<Euclidean>() <= tol
}

/// Join segments that share endpoints into as few line strings as possible
fn chain(mut pieces: Vec<Line<f64>>, tol: f64) -> MultiLineString<f64> {
    let mut lines = Vec::new();
    while let Some(first) = pieces.pop() {
        let mut coords = vec![first.start, first.end];
        loop {
            let Some(tail) = coords.last().copied() else {
                break;
            };
            let head = coords[0];
            if let Some(i) = pieces.iter().position(|p| near(p.start, tail, tol) || near(p.end, tail, tol)) {
                let p = pieces.swap_remove(i);
                coords.push(if near(p.start, tail, tol) { p.end } else { p.start });
            } else if let Some(i) = pieces.iter().position(|p| near(p.start, head, tol) || near(p.end, head, tol)) {
                let p = pieces.swap_remove(i);
                coords.insert(0, if near(p.end, head, tol) { p.start } else { p.end });
            } else {
                break;
            }
        }
        lines.push(LineString::from(coords));
    }
    MultiLineString::new(lines)
}

/// Boundary stretches shared by two polygons.
///
/// Segments of both polygons' rings that run along each other (within `tol`)
/// contribute their common part; the pieces are then chained end to end.
pub fn shared_boundary(a: &Polygon<f64>, b: &Polygon<f64>, tol: f64) -> MultiLineString<f64> {
    let b_segments: Vec<Line<f64>> = rings(b).flat_map(|r| r.lines()).collect();
    let mut pieces = Vec::new();
    for seg in rings(a).flat_map(|r| r.lines()) {
        for other in &b_segments {
            if let Some(piece) = collinear_overlap(seg, *other, tol) {
                pieces.push(piece);
            }
        }
    }
    chain(pieces, tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::measurements::line_length;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )
    }

    fn multi(p: Polygon<f64>) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![p])
    }

    #[test]
    fn test_intersect() {
        let a = multi(rect(0.0, 0.0, 10.0, 10.0));
        let b = multi(rect(5.0, 5.0, 15.0, 15.0));
        assert!((intersect(&a, &b).unsigned_area() - 25.0).abs() < 1e-9);

        // Edge contact has no area
        let touching = multi(rect(10.0, 0.0, 20.0, 10.0));
        assert!(intersect(&a, &touching).unsigned_area() < 1e-9);
    }

    #[test]
    fn test_erase() {
        let a = multi(rect(0.0, 0.0, 10.0, 10.0));
        let b = multi(rect(0.0, 0.0, 10.0, 4.0));
        assert!((erase(&a, &b).unsigned_area() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_adjacent() {
        let parts = [rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 2.0, 1.0), rect(5.0, 5.0, 6.0, 6.0)];
        let merged = merge(&parts);
        assert_eq!(merged.0.len(), 2);
        assert!((merged.unsigned_area() - 3.0).abs() < 1e-9);
        assert!(merge(std::iter::empty()).0.is_empty());
    }

    #[test]
    fn test_largest_polygon_fragment() {
        let parts = vec![
            rect(0.0, 0.0, 5.0, 1.0),
            rect(10.0, 0.0, 60.0, 1.0),
            rect(70.0, 0.0, 82.0, 1.0),
        ];
        let kept = largest_polygon(parts).unwrap();
        assert_eq!(kept.unsigned_area(), 50.0);
        assert!(largest_polygon(vec![]).is_none());
    }

    #[test]
    fn test_shared_boundary_of_nested_polygons() {
        // Outer 4x4 square, inner polygon sharing its left and bottom edges
        let outer = rect(0.0, 0.0, 4.0, 4.0);
        let inner = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 1.0), (1.0, 1.0), (1.0, 3.0), (0.0, 3.0), (0.0, 0.0)]),
            vec![],
        );
        let shared = shared_boundary(&outer, &inner, 1e-9);
        assert_eq!(shared.0.len(), 1, "one connected dam line");
        let total: f64 = shared.0.iter().map(line_length).sum();
        assert!((total - 8.0).abs() < 1e-9, "bottom 4 + right 1 + left 3, got {total}");
    }

    #[test]
    fn test_shared_boundary_disjoint() {
        let shared = shared_boundary(&rect(0.0, 0.0, 1.0, 1.0), &rect(2.0, 2.0, 3.0, 3.0), 1e-9);
        assert!(shared.0.is_empty());
    }
}
