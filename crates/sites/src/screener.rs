//! Pour-point screening
//!
//! For every pour point: delineate the catchment inside a window around the
//! point, pool water up to the dam crest, keep the largest pool, trace the
//! dam where the pool meets the catchment edge, and compute volumes.

use crate::config::{DepthReference, ScreenParams};
use crate::engine::{Layer, RasterVectorEngine};
use crate::error::{Result, SiteError};
use crate::model::{Candidate, PourPoint, SiteRecord};
use crate::store::Ledger;
use drygully_algorithms::maybe_rayon::*;
use drygully_algorithms::vector::{area, largest_polygon, length};
use drygully_core::raster::{Extent, Raster};
use geo::{Geometry, MultiLineString, MultiPolygon};
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// Why a point produced no candidate although nothing went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No valid cell drains to the point
    EmptyWatershed,
    TooFewCells { cells: usize, required: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyWatershed => write!(f, "empty watershed"),
            SkipReason::TooFewCells { cells, required } => {
                write!(f, "{} reservoir cells, {} required", cells, required)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum PointOutcome {
    Screened(Candidate),
    Skipped { id: u32, reason: SkipReason },
    Failed { id: u32, error: String },
}

impl PointOutcome {
    pub fn id(&self) -> u32 {
        match self {
            PointOutcome::Screened(c) => c.id(),
            PointOutcome::Skipped { id, .. } | PointOutcome::Failed { id, .. } => *id,
        }
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            PointOutcome::Screened(c) => Some(c),
            _ => None,
        }
    }
}

/// Outcomes of a batch, ordered by point id
#[derive(Debug, Clone, Default)]
pub struct ScreeningReport {
    pub outcomes: Vec<PointOutcome>,
}

impl ScreeningReport {
    pub fn screened(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, PointOutcome::Screened(_))).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, PointOutcome::Skipped { .. })).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, PointOutcome::Failed { .. })).count()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.outcomes.iter().filter_map(PointOutcome::candidate)
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                PointOutcome::Screened(c) => Some(c),
                _ => None,
            })
            .collect()
    }
}

enum Evaluation {
    Site(Box<Candidate>),
    Skip(SkipReason),
}

/// Mask of the cells of `values` holding valid data
fn valid_mask(values: &Raster<f64>) -> Raster<u8> {
    let (rows, cols) = values.shape();
    let mut mask = values.with_same_meta::<u8>(rows, cols);
    mask.set_nodata(Some(0));
    *mask.data_mut() = values.data().mapv(|v| u8::from(!values.is_nodata(v)));
    mask
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct PourPointScreener<'a, E: ?Sized> {
    engine: &'a E,
    params: ScreenParams,
}

impl<'a, E: RasterVectorEngine + ?Sized> PourPointScreener<'a, E> {
    pub fn new(engine: &'a E, params: ScreenParams) -> Self {
        Self { engine, params }
    }

    pub fn params(&self) -> &ScreenParams {
        &self.params
    }

    /// Screen one point. Engine errors and panics are caught and reported
    /// as [`PointOutcome::Failed`].
    pub fn screen_point(&self, point: &PourPoint) -> PointOutcome {
        let id = point.id;
        match catch_unwind(AssertUnwindSafe(|| self.evaluate(point))) {
            Ok(Ok(Evaluation::Site(candidate))) => {
                info!("RES_{} screened, ratio {:.2}", id, candidate.ratio());
                PointOutcome::Screened(*candidate)
            }
            Ok(Ok(Evaluation::Skip(reason))) => {
                info!("RES_{} skipped: {}", id, reason);
                PointOutcome::Skipped { id, reason }
            }
            Ok(Err(e @ SiteError::Integrity { .. })) => {
                error!("{}", e);
                PointOutcome::Failed { id, error: e.to_string() }
            }
            Ok(Err(e)) => {
                warn!("RES_{} failed: {}", id, e);
                PointOutcome::Failed { id, error: e.to_string() }
            }
            Err(payload) => {
                let msg = panic_message(&*payload);
                warn!("RES_{} panicked: {}", id, msg);
                PointOutcome::Failed { id, error: msg }
            }
        }
    }

    /// Screen every point selected by the configured range, in parallel.
    ///
    /// Outcomes come back ordered by id; the records of screened points are
    /// appended to `ledger` in that order.
    pub fn screen_all(&self, points: &[PourPoint], ledger: Option<&mut Ledger>) -> Result<ScreeningReport> {
        let selected: Vec<&PourPoint> = points.iter().filter(|p| self.params.range.includes(p.id)).collect();
        info!("Screening {} of {} pour points", selected.len(), points.len());

        let mut outcomes: Vec<PointOutcome> = selected.into_par_iter().map(|p| self.screen_point(p)).collect();
        outcomes.sort_by_key(PointOutcome::id);

        if let Some(ledger) = ledger {
            for candidate in outcomes.iter().filter_map(PointOutcome::candidate) {
                ledger.write(&candidate.record)?;
            }
            ledger.flush()?;
        }

        let report = ScreeningReport { outcomes };
        info!(
            "Screening done: {} screened, {} skipped, {} failed",
            report.screened(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    fn evaluate(&self, point: &PourPoint) -> Result<Evaluation> {
        let p = &self.params;
        let id = point.id;
        let (x, y) = (point.longitude, point.latitude);
        let extent = Extent::around(x, y, p.window_half_size);

        let Some(watershed) = self.engine.watershed(x, y, &extent)? else {
            return Ok(Evaluation::Skip(SkipReason::EmptyWatershed));
        };
        let watershed_dem = self.engine.extract_by_mask(Layer::Elevation, &watershed, &extent)?;
        let Some(elevpoint) = watershed_dem.statistics().min else {
            return Ok(Evaluation::Skip(SkipReason::EmptyWatershed));
        };

        let crest = elevpoint + p.max_dam_height;
        let reservoir_dem = self.engine.extract_at_most(&watershed_dem, crest);
        let cells = reservoir_dem.valid_count();
        info!("RES_{}: {} cells", id, cells);
        if cells < p.min_reservoir_cells {
            return Ok(Evaluation::Skip(SkipReason::TooFewCells {
                cells,
                required: p.min_reservoir_cells,
            }));
        }

        let watershed_parts = self.engine.polygonize(&valid_mask(&watershed_dem));
        let reservoir_parts = self.engine.polygonize(&valid_mask(&reservoir_dem));
        let parts = reservoir_parts.len();
        let reservoir = largest_polygon(reservoir_parts).ok_or_else(|| SiteError::Integrity {
            id,
            reason: format!("{} reservoir cells but no reservoir polygon", cells),
        })?;
        debug!("RES_{}: kept largest of {} reservoir parts", id, parts);
        if reservoir.exterior().0.len() < 4 {
            return Err(SiteError::Integrity {
                id,
                reason: "reservoir polygon has a degenerate outline".into(),
            });
        }

        let tolerance = watershed_dem.cell_size() * 1e-3;
        let dam = MultiLineString::new(
            watershed_parts
                .iter()
                .flat_map(|w| self.engine.boundary_intersection(w, &reservoir, tolerance).0)
                .collect(),
        );
        let footprint = MultiPolygon::new(vec![reservoir.clone()]);

        let projected_reservoir = self.engine.project(&Geometry::Polygon(reservoir.clone()))?;
        let projected_dam = self.engine.project(&Geometry::MultiLineString(dam.clone()))?;
        let water_area_ha = area(&projected_reservoir) / 1e4;
        let dam_length_m = length(&projected_dam);

        let mean_slope = self
            .engine
            .summarize_polygons(Layer::Slope, &footprint, &extent)?
            .map(|s| s.mean)
            .filter(|s| s.is_finite() && *s != 0.0);
        let ground_area_ha = match mean_slope {
            Some(deg) => water_area_ha / deg.to_radians().cos(),
            None => water_area_ha,
        };

        let dam_mean = self
            .engine
            .summarize_lines(Layer::Elevation, &dam, &extent)?
            .map(|s| s.mean)
            .unwrap_or(elevpoint);
        let reference = match p.depth_reference {
            DepthReference::DamMean => dam_mean,
            DepthReference::ReservoirMean => self
                .engine
                .summarize_polygons(Layer::Elevation, &footprint, &extent)?
                .map(|s| s.mean)
                .unwrap_or(elevpoint),
        };

        let head = crest - dam_mean;
        let dam_area_ha = dam_length_m * head * 1e-4 / p.dam_batter.atan().cos();
        let dam_volume_gl = dam_length_m * head * head * 1e-6 * p.dam_batter;
        let reservoir_volume_gl = water_area_ha * (crest - reference) * 1e-2 + 0.5 * dam_volume_gl;
        let water_rock_ratio = if dam_volume_gl == 0.0 {
            0.0
        } else {
            reservoir_volume_gl / dam_volume_gl
        };
        debug!(
            "RES_{}: water {:.2} ha, dam {:.1} m at mean {:.2} m, volume {:.3} GL",
            id, water_area_ha, dam_length_m, dam_mean, reservoir_volume_gl
        );

        let record = SiteRecord {
            id,
            latitude: point.latitude,
            longitude: point.longitude,
            elevation_m: elevpoint,
            water_area_ha,
            ground_area_ha,
            reservoir_volume_gl,
            dam_length_m,
            dam_area_ha,
            dam_volume_gl,
            water_rock_ratio,
        };
        Ok(Evaluation::Site(Box::new(Candidate { record, reservoir, dam })))
    }
}
