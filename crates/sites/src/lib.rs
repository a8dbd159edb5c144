//! # DryGully Sites
//!
//! Screening of off-river pumped-hydro reservoir sites on a DEM.
//!
//! The pipeline runs in three stages, each usable on its own:
//!
//! 1. [`PourPointScreener`] turns pour points into candidates: a reservoir
//!    polygon, a dam polyline and the site metrics. Records go to the CSV
//!    [`Ledger`], candidates to a [`CandidateStore`].
//! 2. [`OverlapResolver`] drops the worse of every pair of overlapping
//!    reservoirs.
//! 3. [`PrettySetBuilder`] turns each surviving site into a smoothed
//!    presentation set: the dam footprint and the reservoir, tagged
//!    `DAM_<id>` and `RES_<id>`.
//!
//! All raster and geometry work goes through a [`RasterVectorEngine`];
//! [`NativeEngine`] is the in-memory implementation.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod model;
pub mod pretty;
pub mod report;
pub mod resolver;
pub mod screener;
pub mod separation;
pub mod store;

pub use config::{Config, DepthReference, OverlapParams, PrettyParams, ScreenParams, ScreenRange};
pub use engine::{condition, Layer, NativeEngine, RasterVectorEngine};
pub use error::{Result, SiteError};
pub use model::{Candidate, PourPoint, SiteRecord};
pub use pretty::{export_pretty_set, PrettyReport, PrettySetBuilder, PrettySite, SiteOutcome};
pub use resolver::{OverlapResolver, Resolution};
pub use screener::{PointOutcome, PourPointScreener, ScreeningReport, SkipReason};
pub use separation::{separate_land, SeparationParams, Variant};
pub use store::{CandidateStore, Ledger};
