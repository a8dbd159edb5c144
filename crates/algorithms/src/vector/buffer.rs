//! Buffer operations
//!
//! Circles around points, and flat-ended corridors around lines: each
//! segment becomes a rectangle and interior vertices get round joins.

use geo::{BooleanOps, Coord, Euclidean, Length, Line, LineString, MultiLineString, MultiPolygon, Point, Polygon};
use std::f64::consts::PI;

/// Parameters for buffer operations
#[derive(Debug, Clone)]
pub struct BufferParams {
    /// Buffer distance on each side
    pub distance: f64,
    /// Number of segments approximating a full circle
    pub segments: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 1.0,
            segments: 32,
        }
    }
}

/// Circular buffer around a point
pub fn buffer_point(point: &Point<f64>, params: &BufferParams) -> Polygon<f64> {
    let n = params.segments.max(4);
    let r = params.distance.abs();
    let (cx, cy) = (point.x(), point.y());

    let mut coords: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / n as f64;
            (cx + r * angle.cos(), cy + r * angle.sin())
        })
        .collect();
    coords.push(coords[0]);

    Polygon::new(LineString::from(coords), vec![])
}

fn segment_rectangle(a: Coord<f64>, b: Coord<f64>, distance: f64) -> Option<Polygon<f64>> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = Line::new(a, b).length::<Euclidean>();
    if len == 0.0 {
        return None;
    }
    let (nx, ny) = (-dy / len * distance, dx / len * distance);
    Some(Polygon::new(
        LineString::from(vec![
            (a.x - nx, a.y - ny),
            (b.x - nx, b.y - ny),
            (b.x + nx, b.y + ny),
            (a.x + nx, a.y + ny),
            (a.x - nx, a.y - ny),
        ]),
        vec![],
    ))
}

/// Buffer lines by `params.distance` on both sides with flat end caps.
///
/// The ends stop square at the line's first and last vertex; bends are
/// rounded. Closed lines have no ends, so every vertex is a bend.
pub fn buffer_lines_flat(lines: &MultiLineString<f64>, params: &BufferParams) -> MultiPolygon<f64> {
    let distance = params.distance.abs();
    if distance == 0.0 {
        return MultiPolygon::new(vec![]);
    }

    let mut pieces: Vec<Polygon<f64>> = Vec::new();
    for line in &lines.0 {
        let coords = &line.0;
        if coords.len() < 2 {
            continue;
        }
        pieces.extend(coords.windows(2).filter_map(|w| segment_rectangle(w[0], w[1], distance)));

        let closed = line.is_closed() && coords.len() > 2;
        let joins = if closed {
            &coords[..coords.len() - 1]
        } else {
            &coords[1..coords.len() - 1]
        };
        pieces.extend(joins.iter().map(|c| buffer_point(&Point::from(*c), params)));
    }

    pieces.into_iter().fold(MultiPolygon::new(vec![]), |acc, p| {
        if acc.0.is_empty() {
            MultiPolygon::new(vec![p])
        } else {
            acc.union(&MultiPolygon::new(vec![p]))
        }
    })
}
