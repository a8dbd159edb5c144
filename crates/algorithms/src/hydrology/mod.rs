//! Hydrological conditioning and catchment delineation
//!
//! - Priority-Flood: O(n log n) depression filling (Barnes 2014)
//! - Flow direction: D8 single flow direction
//! - Watershed: upstream catchments of pour points
//!
//! D8 encoding shared by every module here:
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! `0` marks a pit, a flat or no-data.

mod flow_direction;
mod priority_flood;
mod watershed;

pub use flow_direction::{flow_direction, FlowDirectionParams};
pub use priority_flood::{priority_flood, PriorityFloodParams};
pub use watershed::{watershed, WatershedParams};

/// D8 neighbor offsets `(row, col)` indexed by `code - 1`
pub(crate) const D8_OFFSETS: [(isize, isize); 8] = [
    (0, 1),   // 1: E
    (-1, 1),  // 2: NE
    (-1, 0),  // 3: N
    (-1, -1), // 4: NW
    (0, -1),  // 5: W
    (1, -1),  // 6: SW
    (1, 0),   // 7: S
    (1, 1),   // 8: SE
];

/// Direction code pointing back at a cell from its neighbor
pub(crate) fn opposite_dir(dir: u8) -> u8 {
    if dir == 0 {
        return 0;
    }
    ((dir - 1 + 4) % 8) + 1
}

/// Neighbor of `(row, col)` at D8 offset `idx`, if inside a `rows x cols` grid
#[inline]
pub(crate) fn neighbor(
    row: usize,
    col: usize,
    idx: usize,
    rows: usize,
    cols: usize,
) -> Option<(usize, usize)> {
    let (dr, dc) = D8_OFFSETS[idx];
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        None
    } else {
        Some((nr as usize, nc as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_direction() {
        assert_eq!(opposite_dir(1), 5);
        assert_eq!(opposite_dir(3), 7);
        assert_eq!(opposite_dir(2), 6);
        assert_eq!(opposite_dir(8), 4);
        assert_eq!(opposite_dir(0), 0);
    }

    #[test]
    fn test_neighbor_bounds() {
        assert_eq!(neighbor(0, 0, 0, 3, 3), Some((0, 1)));
        assert_eq!(neighbor(0, 0, 2, 3, 3), None);
        assert_eq!(neighbor(2, 2, 7, 3, 3), None);
    }
}
