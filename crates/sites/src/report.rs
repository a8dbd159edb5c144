//! Run summaries written next to the outputs

use crate::error::Result;
use crate::model::SiteRecord;
use crate::pretty::{PrettyReport, SiteOutcome};
use crate::resolver::Resolution;
use crate::screener::{PointOutcome, ScreeningReport, SkipReason};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PointEntry {
    Screened {
        id: u32,
        record: SiteRecord,
    },
    Skipped {
        id: u32,
        #[serde(flatten)]
        reason: SkipReason,
    },
    Failed {
        id: u32,
        error: String,
    },
}

impl From<&PointOutcome> for PointEntry {
    fn from(outcome: &PointOutcome) -> Self {
        match outcome {
            PointOutcome::Screened(c) => PointEntry::Screened {
                id: c.id(),
                record: c.record,
            },
            PointOutcome::Skipped { id, reason } => PointEntry::Skipped { id: *id, reason: *reason },
            PointOutcome::Failed { id, error } => PointEntry::Failed {
                id: *id,
                error: error.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScreeningSummary {
    pub screened: usize,
    pub skipped: usize,
    pub failed: usize,
    pub points: Vec<PointEntry>,
}

impl From<&ScreeningReport> for ScreeningSummary {
    fn from(report: &ScreeningReport) -> Self {
        Self {
            screened: report.screened(),
            skipped: report.skipped(),
            failed: report.failed(),
            points: report.outcomes.iter().map(PointEntry::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PrettySummary {
    pub retained: Vec<u32>,
    pub removed: Vec<u32>,
    pub built: usize,
    pub failed: usize,
    pub sites: Vec<SiteOutcome>,
}

impl PrettySummary {
    pub fn new(resolution: &Resolution, report: &PrettyReport) -> Self {
        Self {
            retained: resolution.retained.iter().map(|c| c.id()).collect(),
            removed: resolution.removed.clone(),
            built: report.built(),
            failed: report.failed(),
            sites: report.outcomes.clone(),
        }
    }
}

/// Pretty-printed JSON of any summary
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, summary: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(summary)?;
    fs::write(path, text)?;
    Ok(())
}
