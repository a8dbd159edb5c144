//! Pour points, site records and candidates

use crate::error::{Result, SiteError};
use drygully_core::vector::{AttributeValue, Feature};
use geo::{Geometry, MultiLineString, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Attribute names persisted on reservoir features, in column order
pub const RECORD_FIELDS: [&str; 10] = [
    "Lat",
    "Long",
    "Elevation_m",
    "Water_area_ha",
    "Ground_area_ha",
    "Reservoir_volume_GL",
    "Dam_length_m",
    "Dam_area_ha",
    "Dam_volume_GL",
    "Water_rock_ratio",
];

/// A candidate discharge location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PourPoint {
    pub id: u32,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "long")]
    pub longitude: f64,
}

impl PourPoint {
    pub fn new(id: u32, latitude: f64, longitude: f64) -> Self {
        Self { id, latitude, longitude }
    }

    /// Read pour points from a CSV with an `id,lat,long` header.
    ///
    /// Extra columns are ignored. Duplicate ids are rejected.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<PourPoint>> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let mut points = Vec::new();
        let mut seen = BTreeSet::new();
        for row in reader.deserialize() {
            let point: PourPoint = row?;
            if !seen.insert(point.id) {
                return Err(SiteError::DuplicateId(point.id));
            }
            points.push(point);
        }
        Ok(points)
    }
}

/// Metrics of one screened site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// Lowest watershed elevation, the dam toe (m)
    pub elevation_m: f64,
    pub water_area_ha: f64,
    pub ground_area_ha: f64,
    pub reservoir_volume_gl: f64,
    pub dam_length_m: f64,
    pub dam_area_ha: f64,
    pub dam_volume_gl: f64,
    pub water_rock_ratio: f64,
}

impl SiteRecord {
    pub fn values(&self) -> [f64; 10] {
        [
            self.latitude,
            self.longitude,
            self.elevation_m,
            self.water_area_ha,
            self.ground_area_ha,
            self.reservoir_volume_gl,
            self.dam_length_m,
            self.dam_area_ha,
            self.dam_volume_gl,
            self.water_rock_ratio,
        ]
    }

    /// Attributes under their persisted names
    pub fn attributes(&self) -> Vec<(String, AttributeValue)> {
        RECORD_FIELDS
            .iter()
            .zip(self.values())
            .map(|(name, v)| (name.to_string(), AttributeValue::Float(v)))
            .collect()
    }

    /// Rebuild a record from persisted attributes
    pub fn from_feature(id: u32, feature: &Feature) -> Result<Self> {
        let get = |name: &str| {
            feature
                .get_property(name)
                .and_then(AttributeValue::as_f64)
                .ok_or_else(|| SiteError::Export(format!("RES_{} has no numeric {}", id, name)))
        };
        Ok(SiteRecord {
            id,
            latitude: get("Lat")?,
            longitude: get("Long")?,
            elevation_m: get("Elevation_m")?,
            water_area_ha: get("Water_area_ha")?,
            ground_area_ha: get("Ground_area_ha")?,
            reservoir_volume_gl: get("Reservoir_volume_GL")?,
            dam_length_m: get("Dam_length_m")?,
            dam_area_ha: get("Dam_area_ha")?,
            dam_volume_gl: get("Dam_volume_GL")?,
            water_rock_ratio: get("Water_rock_ratio")?,
        })
    }
}

pub fn reservoir_index(id: u32) -> String {
    format!("RES_{}", id)
}

pub fn dam_index(id: u32) -> String {
    format!("DAM_{}", id)
}

pub fn site_index(id: u32) -> String {
    format!("RESDAM_{}", id)
}

/// A screened site: its record with the reservoir footprint and dam line,
/// both in the source CRS
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub record: SiteRecord,
    pub reservoir: Polygon<f64>,
    pub dam: MultiLineString<f64>,
}

impl Candidate {
    pub fn id(&self) -> u32 {
        self.record.id
    }

    pub fn ratio(&self) -> f64 {
        self.record.water_rock_ratio
    }

    /// Reservoir feature carrying every persisted attribute
    pub fn reservoir_feature(&self) -> Feature {
        let mut feature = Feature::new(Geometry::Polygon(self.reservoir.clone()));
        feature.properties = self.record.attributes();
        feature.set_property("Index", reservoir_index(self.id()));
        feature.with_id(reservoir_index(self.id()))
    }

    pub fn dam_feature(&self) -> Feature {
        let mut feature = Feature::new(Geometry::MultiLineString(self.dam.clone()));
        feature.set_property("Index", dam_index(self.id()));
        feature.with_id(dam_index(self.id()))
    }
}
