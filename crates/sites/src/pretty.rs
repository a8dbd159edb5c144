//! Presentation set: a smoothed dam footprint and reservoir per site
//!
//! Every site becomes a `RESDAM_<id>` set of two members, the dam footprint
//! tagged `DAM_<id>` and the reservoir tagged `RES_<id>`. Only the reservoir
//! carries the site record.

use crate::config::PrettyParams;
use crate::engine::RasterVectorEngine;
use crate::error::{Result, SiteError};
use crate::export::{write_geojson, write_kml};
use crate::model::{dam_index, reservoir_index, site_index, Candidate, SiteRecord};
use crate::screener::panic_message;
use drygully_algorithms::vector::{area, perimeter};
use drygully_core::vector::{AttributeValue, Feature};
use drygully_core::CRS;
use geo::{Geometry, MultiLineString, MultiPolygon};
use serde::Serialize;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Attributes kept on a presentation feature, in output order
pub const PRETTY_FIELDS: [&str; 13] = [
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
    "Index",
    "Shape_Length",
    "Shape_Area",
];

const TRUNCATED_FIELDS: [&str; 5] = [
    "Water_area_ha",
    "Ground_area_ha",
    "Reservoir_volume_GL",
    "Dam_length_m",
    "Water_rock_ratio",
];

const ONE_DECIMAL_FIELDS: [&str; 2] = ["Dam_area_ha", "Dam_volume_GL"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SiteOutcome {
    Built { id: u32 },
    Failed { id: u32, error: String },
}

impl SiteOutcome {
    pub fn id(&self) -> u32 {
        match self {
            SiteOutcome::Built { id } | SiteOutcome::Failed { id, .. } => *id,
        }
    }
}

/// The presentation members of one site, in the source CRS
#[derive(Debug, Clone)]
pub struct PrettySite {
    pub id: u32,
    /// Dam footprint first when it is not empty, then the reservoir
    pub members: Vec<Feature>,
}

impl PrettySite {
    pub fn name(&self) -> String {
        site_index(self.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrettyReport {
    pub sites: Vec<PrettySite>,
    pub outcomes: Vec<SiteOutcome>,
}

impl PrettyReport {
    pub fn built(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, SiteOutcome::Built { .. })).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.built()
    }
}

/// Rounded record attributes as shown on the presentation set
pub fn presentation_attributes(record: &SiteRecord) -> Vec<(String, AttributeValue)> {
    record
        .attributes()
        .into_iter()
        .map(|(name, value)| {
            let v = value.as_f64().unwrap_or(f64::NAN);
            let value = if TRUNCATED_FIELDS.contains(&name.as_str()) {
                AttributeValue::Int(v.trunc() as i64)
            } else if ONE_DECIMAL_FIELDS.contains(&name.as_str()) {
                AttributeValue::Float((v * 10.0).round() / 10.0)
            } else {
                value
            };
            (name, value)
        })
        .collect()
}

fn as_polygons(id: u32, geometry: Geometry<f64>) -> Result<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        other => Err(SiteError::Integrity {
            id,
            reason: format!("expected an areal geometry, got {:?}", other),
        }),
    }
}

fn as_lines(id: u32, geometry: Geometry<f64>) -> Result<MultiLineString<f64>> {
    match geometry {
        Geometry::LineString(ls) => Ok(MultiLineString::new(vec![ls])),
        Geometry::MultiLineString(mls) => Ok(mls),
        other => Err(SiteError::Integrity {
            id,
            reason: format!("expected a linear geometry, got {:?}", other),
        }),
    }
}

pub struct PrettySetBuilder {
    params: PrettyParams,
}

impl PrettySetBuilder {
    pub fn new(params: PrettyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PrettyParams {
        &self.params
    }

    /// Build the presentation members of every candidate. A site that
    /// fails is logged and reported; the others are still built.
    pub fn build<E: RasterVectorEngine + ?Sized>(&self, engine: &E, candidates: &[Candidate]) -> PrettyReport {
        let mut report = PrettyReport::default();
        for candidate in candidates {
            let id = candidate.id();
            match catch_unwind(AssertUnwindSafe(|| self.build_site(engine, candidate))) {
                Ok(Ok(site)) => {
                    debug!("{} built", site.name());
                    report.sites.push(site);
                    report.outcomes.push(SiteOutcome::Built { id });
                }
                Ok(Err(e)) => {
                    warn!("{} failed: {}", site_index(id), e);
                    report.outcomes.push(SiteOutcome::Failed { id, error: e.to_string() });
                }
                Err(payload) => {
                    let msg = panic_message(&*payload);
                    warn!("{} panicked: {}", site_index(id), msg);
                    report.outcomes.push(SiteOutcome::Failed { id, error: msg });
                }
            }
        }
        info!("Pretty set: {} built, {} failed", report.built(), report.failed());
        report
    }

    fn build_site<E: RasterVectorEngine + ?Sized>(&self, engine: &E, candidate: &Candidate) -> Result<PrettySite> {
        let id = candidate.id();
        let reservoir = as_polygons(id, engine.project(&Geometry::Polygon(candidate.reservoir.clone()))?)?;
        let dam = as_lines(id, engine.project(&Geometry::MultiLineString(candidate.dam.clone()))?)?;

        let footprint = engine.buffer_lines(&dam, self.params.dam_buffer_m);
        let footprint = engine.merge(&engine.erase(&footprint, &reservoir).0);

        let mut members = Vec::with_capacity(2);
        if footprint.0.is_empty() {
            debug!("{}: empty dam footprint", site_index(id));
        } else {
            members.push(self.member(engine, dam_index(id), footprint, Vec::new())?);
        }
        let attributes = presentation_attributes(&candidate.record);
        members.push(self.member(engine, reservoir_index(id), reservoir, attributes)?);
        Ok(PrettySite { id, members })
    }

    /// Smooth one projected member, measure it and bring it back to the
    /// source CRS
    fn member<E: RasterVectorEngine + ?Sized>(
        &self,
        engine: &E,
        index: String,
        polygons: MultiPolygon<f64>,
        properties: Vec<(String, AttributeValue)>,
    ) -> Result<Feature> {
        let smoothed = Geometry::MultiPolygon(engine.smooth(&polygons, self.params.smooth_tolerance_m));
        let shape_length = perimeter(&smoothed);
        let shape_area = area(&smoothed);
        debug!("{}: {:.0} m perimeter, {:.0} m2", index, shape_length, shape_area);

        let mut feature = Feature::new(engine.unproject(&smoothed)?).with_id(index.clone());
        feature.properties = properties;
        feature.set_property("Index", index);
        feature.set_property("Shape_Length", shape_length);
        feature.set_property("Shape_Area", shape_area);
        feature.retain_fields(&PRETTY_FIELDS);
        Ok(feature)
    }
}

/// Write `RESDAM_<id>.geojson` (and `.kml` when asked) holding the members
/// of every site, returning the paths written
pub fn export_pretty_set(dir: impl AsRef<Path>, sites: &[PrettySite], crs: CRS, kml: bool) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for site in sites {
        let name = site.name();
        let path = dir.join(format!("{}.geojson", name));
        write_geojson(&path, &site.members, Some(crs))?;
        written.push(path);
        if kml {
            let path = dir.join(format!("{}.kml", name));
            write_kml(&path, &site.members, &name)?;
            written.push(path);
        }
        info!("{} saved", name);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Layer, NativeEngine};
    use crate::export::read_geojson;
    use approx::assert_relative_eq;
    use drygully_algorithms::statistics::{CellSummary, FocalParams};
    use drygully_core::raster::{Extent, GeoTransform, Raster};
    use geo::{LineString, Polygon};

    fn engine() -> NativeEngine {
        let mut dem = Raster::filled(4, 4, 100.0);
        dem.set_transform(GeoTransform::new(138.0, -33.0, 0.001, -0.001));
        NativeEngine::from_dem(dem, CRS::wgs84(), CRS::australian_albers()).unwrap()
    }

    fn record(id: u32) -> SiteRecord {
        SiteRecord {
            id,
            latitude: -33.5,
            longitude: 138.5,
            elevation_m: 250.0,
            water_area_ha: 9.33,
            ground_area_ha: 9.47,
            reservoir_volume_gl: 1.86,
            dam_length_m: 280.4,
            dam_area_ha: 0.87,
            dam_volume_gl: 0.049,
            water_rock_ratio: 37.9,
        }
    }

    /// Square reservoir of side 0.003 deg dammed along its southern edge
    fn candidate(id: u32, lon: f64) -> Candidate {
        let (x0, y0, d) = (lon, -33.5, 0.003);
        let ring = LineString::from(vec![(x0, y0), (x0 + d, y0), (x0 + d, y0 + d), (x0, y0 + d), (x0, y0)]);
        Candidate {
            record: record(id),
            reservoir: Polygon::new(ring, vec![]),
            dam: MultiLineString::new(vec![LineString::from(vec![(x0, y0), (x0 + d, y0)])]),
        }
    }

    #[test]
    fn test_rounding() {
        let attrs = presentation_attributes(&record(1));
        let get = |name: &str| attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()).unwrap();
        assert_eq!(get("Water_area_ha"), AttributeValue::Int(9));
        assert_eq!(get("Dam_length_m"), AttributeValue::Int(280));
        assert_eq!(get("Water_rock_ratio"), AttributeValue::Int(37));
        assert_eq!(get("Reservoir_volume_GL"), AttributeValue::Int(1));
        assert_eq!(get("Dam_area_ha"), AttributeValue::Float(0.9));
        assert_eq!(get("Dam_volume_GL"), AttributeValue::Float(0.0));
        assert_eq!(get("Elevation_m"), AttributeValue::Float(250.0));
    }

    #[test]
    fn test_negative_values_truncate_toward_zero() {
        let mut r = record(1);
        r.water_rock_ratio = -2.7;
        let attrs = presentation_attributes(&r);
        let ratio = attrs.iter().find(|(k, _)| k == "Water_rock_ratio").unwrap();
        assert_eq!(ratio.1, AttributeValue::Int(-2));
    }

    fn measured(feature: &Feature, name: &str) -> f64 {
        feature.get_property(name).and_then(|v| v.as_f64()).unwrap()
    }

    #[test]
    fn test_site_members() {
        let engine = engine();
        let site = candidate(7, 138.5);
        let report = PrettySetBuilder::new(PrettyParams::default()).build(&engine, &[site.clone()]);
        assert_eq!(report.outcomes, vec![SiteOutcome::Built { id: 7 }]);

        let built = &report.sites[0];
        assert_eq!(built.name(), "RESDAM_7");
        let [dam, reservoir] = built.members.as_slice() else {
            panic!("expected two members, got {}", built.members.len());
        };
        assert_eq!(dam.get_property("Index").and_then(|v| v.as_str()), Some("DAM_7"));
        assert_eq!(reservoir.get_property("Index").and_then(|v| v.as_str()), Some("RES_7"));

        let names = |f: &Feature| f.properties.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>();
        assert_eq!(names(reservoir), PRETTY_FIELDS.to_vec());
        assert_eq!(names(dam), vec!["Index", "Shape_Length", "Shape_Area"]);

        // The footprint is at most a 15 m strip outside the dam; smoothing
        // wears its ends
        let dam_length = drygully_algorithms::vector::length(
            &engine.project(&Geometry::MultiLineString(site.dam.clone())).unwrap(),
        );
        let dam_area = measured(dam, "Shape_Area");
        assert!(dam_area > 0.5 * dam_length * 15.0 && dam_area < 1.02 * dam_length * 15.0, "{dam_area}");

        let reservoir_area = area(&engine.project(&Geometry::Polygon(site.reservoir.clone())).unwrap());
        assert_relative_eq!(measured(reservoir, "Shape_Area"), reservoir_area, max_relative = 0.03);

        // Back in degrees, close to the original footprint
        let Some(Geometry::MultiPolygon(mp)) = &reservoir.geometry else {
            panic!("expected a multipolygon");
        };
        let centroid = geo::Centroid::centroid(mp).unwrap();
        assert!((centroid.x() - 138.5015).abs() < 2e-4);
        assert!((centroid.y() - (-33.4985)).abs() < 2e-4);
    }

    #[test]
    fn test_shape_fields_describe_exported_geometry() {
        let engine = engine();
        let report = PrettySetBuilder::new(PrettyParams::default()).build(&engine, &[candidate(7, 138.5)]);
        for member in &report.sites[0].members {
            let exported = engine.project(member.geometry.as_ref().unwrap()).unwrap();
            assert_relative_eq!(measured(member, "Shape_Area"), area(&exported), max_relative = 1e-6);
            assert_relative_eq!(measured(member, "Shape_Length"), perimeter(&exported), max_relative = 1e-6);
        }

        // Without smoothing the reservoir keeps its square footprint
        let params = PrettyParams { smooth_tolerance_m: 0.0, ..PrettyParams::default() };
        let site = candidate(7, 138.5);
        let raw = PrettySetBuilder::new(params).build(&engine, &[site.clone()]);
        let square = area(&engine.project(&Geometry::Polygon(site.reservoir)).unwrap());
        let smoothed = measured(&report.sites[0].members[1], "Shape_Area");
        assert_relative_eq!(measured(&raw.sites[0].members[1], "Shape_Area"), square, max_relative = 1e-9);
        assert!(smoothed < square);
    }

    struct Rejecting(NativeEngine);

    impl RasterVectorEngine for Rejecting {
        fn source_crs(&self) -> CRS {
            self.0.source_crs()
        }
        fn projected_crs(&self) -> CRS {
            self.0.projected_crs()
        }
        fn watershed(&self, x: f64, y: f64, e: &Extent) -> Result<Option<Raster<u8>>> {
            self.0.watershed(x, y, e)
        }
        fn window(&self, l: Layer, e: &Extent) -> Result<Raster<f64>> {
            self.0.window(l, e)
        }
        fn extract_by_mask(&self, l: Layer, m: &Raster<u8>, e: &Extent) -> Result<Raster<f64>> {
            self.0.extract_by_mask(l, m, e)
        }
        fn focal_statistics(&self, l: Layer, e: &Extent, p: FocalParams) -> Result<Raster<f64>> {
            self.0.focal_statistics(l, e, p)
        }
        fn summarize_polygons(&self, l: Layer, p: &MultiPolygon<f64>, e: &Extent) -> Result<Option<CellSummary>> {
            self.0.summarize_polygons(l, p, e)
        }
        fn summarize_lines(&self, l: Layer, p: &MultiLineString<f64>, e: &Extent) -> Result<Option<CellSummary>> {
            self.0.summarize_lines(l, p, e)
        }
        fn project(&self, g: &Geometry<f64>) -> Result<Geometry<f64>> {
            // Refuse anything east of 149 degrees
            let far_east = match g {
                Geometry::Polygon(p) => p.exterior().coords().any(|c| c.x > 149.0),
                _ => false,
            };
            if far_east {
                return Err(SiteError::Export("outside the projection zone".into()));
            }
            self.0.project(g)
        }
        fn unproject(&self, g: &Geometry<f64>) -> Result<Geometry<f64>> {
            self.0.unproject(g)
        }
    }

    #[test]
    fn test_failed_site_isolated() {
        let engine = Rejecting(engine());
        let report = PrettySetBuilder::new(PrettyParams::default())
            .build(&engine, &[candidate(1, 138.5), candidate(2, 150.0), candidate(3, 138.6)]);
        assert_eq!(report.built(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(&report.outcomes[1], SiteOutcome::Failed { id: 2, .. }));
        let names: Vec<_> = report.sites.iter().map(PrettySite::name).collect();
        assert_eq!(names, vec!["RESDAM_1", "RESDAM_3"]);
    }

    #[test]
    fn test_export_writes_geojson_and_kml() {
        let engine = engine();
        let report = PrettySetBuilder::new(PrettyParams::default()).build(&engine, &[candidate(4, 138.5)]);
        let dir = tempfile::tempdir().unwrap();
        let written = export_pretty_set(dir.path(), &report.sites, CRS::wgs84(), true).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("RESDAM_4.kml").exists());

        let back = read_geojson(dir.path().join("RESDAM_4.geojson")).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].id.as_deref(), Some("DAM_4"));
        assert_eq!(back[0].get_property("Water_area_ha"), None);
        assert_eq!(back[1].id.as_deref(), Some("RES_4"));
        assert_eq!(back[1].get_property("Water_area_ha"), Some(&AttributeValue::Int(9)));
    }
}
