//! Geometric measurements: area, length, perimeter
//!
//! Results are in CRS units; project geographic geometries first.

use geo::{Area, Euclidean, Geometry, Length, LineString};

/// Planar length of one line string
pub fn line_length(ls: &LineString<f64>) -> f64 {
    ls.length::<Euclidean>()
}

/// Unsigned area of a geometry (0 for non-areal geometries)
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        _ => 0.0,
    }
}

/// Length of a linear geometry; polygons report their perimeter
pub fn length(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Line(l) => l.length::<Euclidean>(),
        Geometry::LineString(ls) => ls.length::<Euclidean>(),
        Geometry::MultiLineString(mls) => mls.length::<Euclidean>(),
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => perimeter(geom),
        _ => 0.0,
    }
}

/// Total length of exterior and interior rings
pub fn perimeter(geom: &Geometry<f64>) -> f64 {
    let rings = |p: &geo::Polygon<f64>| {
        line_length(p.exterior()) + p.interiors().iter().map(line_length).sum::<f64>()
    };
    match geom {
        Geometry::Polygon(p) => rings(p),
        Geometry::MultiPolygon(mp) => mp.0.iter().map(rings).sum(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, Line, MultiLineString, Polygon};

    fn square_with_hole() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0), (2.0, 2.0)])],
        )
    }

    #[test]
    fn test_area_with_hole() {
        assert!((area(&Geometry::Polygon(square_with_hole())) - 64.0).abs() < 1e-10);
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (10.0, 10.0)]));
        assert_eq!(area(&line), 0.0);
    }

    #[test]
    fn test_lengths() {
        let seg = Geometry::Line(Line::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 6.0, y: 8.0 }));
        assert!((length(&seg) - 10.0).abs() < 1e-12);

        let mls = Geometry::MultiLineString(MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (3.0, 4.0)]),
            LineString::from(vec![(0.0, 0.0), (0.0, 5.0)]),
        ]));
        assert!((length(&mls) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_perimeter_with_hole() {
        assert!((perimeter(&Geometry::Polygon(square_with_hole())) - 64.0).abs() < 1e-10);
    }
}
