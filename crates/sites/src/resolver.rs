//! Greedy elimination of overlapping candidates

use crate::config::OverlapParams;
use crate::engine::RasterVectorEngine;
use crate::model::Candidate;
use drygully_algorithms::vector::area;
use geo::{Geometry, MultiPolygon};
use tracing::{debug, info};

/// Outcome of an overlap pass
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Surviving candidates, ascending id
    pub retained: Vec<Candidate>,
    /// Removed ids in removal order
    pub removed: Vec<u32>,
}

/// Removes the worse of every pair of overlapping reservoirs.
///
/// Pairs are visited in id order. A pair is only tested when both pour
/// points lie within `threshold_deg` of each other on both axes. Of two
/// overlapping reservoirs the one with the lower water/rock ratio goes;
/// on a tie the lower id stays. The scan order decides which sites survive
/// a chain of overlaps, so it is part of the result.
#[derive(Debug, Clone, Copy)]
pub struct OverlapResolver {
    pub threshold_deg: f64,
}

impl Default for OverlapResolver {
    fn default() -> Self {
        Self::from(&OverlapParams::default())
    }
}

impl From<&OverlapParams> for OverlapResolver {
    fn from(params: &OverlapParams) -> Self {
        Self::new(params.threshold_deg)
    }
}

impl OverlapResolver {
    pub fn new(threshold_deg: f64) -> Self {
        Self { threshold_deg }
    }

    pub fn resolve<E: RasterVectorEngine + ?Sized>(&self, engine: &E, mut candidates: Vec<Candidate>) -> Resolution {
        candidates.sort_by_key(Candidate::id);
        let footprints: Vec<MultiPolygon<f64>> = candidates
            .iter()
            .map(|c| MultiPolygon::new(vec![c.reservoir.clone()]))
            .collect();

        let n = candidates.len();
        let mut removed = vec![false; n];
        let mut order = Vec::new();

        for i in 0..n {
            if removed[i] {
                continue;
            }
            for j in (i + 1)..n {
                if removed[j] {
                    continue;
                }
                let (a, b) = (&candidates[i].record, &candidates[j].record);
                if (a.latitude - b.latitude).abs() > self.threshold_deg
                    || (a.longitude - b.longitude).abs() > self.threshold_deg
                {
                    continue;
                }
                let overlap = engine.intersect(&footprints[i], &footprints[j]);
                if area(&Geometry::MultiPolygon(overlap)) <= 0.0 {
                    continue;
                }
                debug!(i = a.id, j = b.id, ratio_i = a.water_rock_ratio, ratio_j = b.water_rock_ratio, "overlap");
                if a.water_rock_ratio >= b.water_rock_ratio {
                    removed[j] = true;
                    order.push(b.id);
                    info!("RES_{} removed", b.id);
                } else {
                    removed[i] = true;
                    order.push(a.id);
                    info!("RES_{} removed", a.id);
                    break;
                }
            }
        }

        let retained = candidates
            .into_iter()
            .zip(removed)
            .filter_map(|(c, gone)| (!gone).then_some(c))
            .collect();
        Resolution { retained, removed: order }
    }
}
