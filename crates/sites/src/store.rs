//! Candidate persistence: the CSV ledger and the candidate GeoJSON set

use crate::error::{Result, SiteError};
use crate::export::{read_geojson, write_geojson};
use crate::model::{Candidate, SiteRecord};
use drygully_core::vector::Feature;
use drygully_core::CRS;
use geo::Geometry;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing::{debug, warn};

/// Append-only record ledger, one headerless CSV row per screened site
pub struct Ledger {
    writer: csv::Writer<File>,
}

impl Ledger {
    /// Start a fresh ledger, truncating any existing file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_file(file))
    }

    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: File) -> Self {
        let writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        Self { writer }
    }

    pub fn write(&mut self, record: &SiteRecord) -> Result<()> {
        let mut row = Vec::with_capacity(10);
        row.push(format!("RES_{}", record.id));
        // Whole numbers keep their decimal point: 410.0, not 410
        row.push(format!("{:?}   {:?}", record.latitude, record.longitude));
        row.extend(record.values()[2..].iter().map(|v| format!("{:?}", v)));
        self.writer.write_record(&row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Screened candidates keyed by id
#[derive(Debug, Clone, Default)]
pub struct CandidateStore {
    candidates: BTreeMap<u32, Candidate>,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_candidates(candidates: impl IntoIterator<Item = Candidate>) -> Result<Self> {
        let mut store = Self::new();
        for candidate in candidates {
            store.insert(candidate)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, candidate: Candidate) -> Result<()> {
        let id = candidate.id();
        if self.candidates.contains_key(&id) {
            return Err(SiteError::DuplicateId(id));
        }
        self.candidates.insert(id, candidate);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&Candidate> {
        self.candidates.get(&id)
    }

    /// Candidates in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.values()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.candidates.into_values().collect()
    }

    /// Write every reservoir and dam feature to one FeatureCollection
    pub fn save(&self, path: impl AsRef<Path>, crs: CRS) -> Result<()> {
        let features: Vec<Feature> = self
            .iter()
            .flat_map(|c| [c.reservoir_feature(), c.dam_feature()])
            .collect();
        write_geojson(path, &features, Some(crs))?;
        debug!(candidates = self.len(), "candidate set saved");
        Ok(())
    }

    /// Read a set written by [`CandidateStore::save`].
    ///
    /// Reservoirs and dams are paired by id; an id found in only one role
    /// is dropped with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reservoirs = BTreeMap::new();
        let mut dams = BTreeMap::new();

        for feature in read_geojson(path)? {
            let Some(index) = feature.id.clone() else {
                warn!("feature without id skipped");
                continue;
            };
            if let Some(id) = parse_id(&index, "RES_") {
                reservoirs.insert(id, feature);
            } else if let Some(id) = parse_id(&index, "DAM_") {
                dams.insert(id, feature);
            } else {
                warn!(index = %index, "feature is neither a reservoir nor a dam");
            }
        }

        let mut store = Self::new();
        for (id, reservoir) in reservoirs {
            let Some(dam) = dams.remove(&id) else {
                warn!("RES_{} has no dam, dropped", id);
                continue;
            };
            let record = SiteRecord::from_feature(id, &reservoir)?;
            let reservoir = match reservoir.geometry {
                Some(Geometry::Polygon(p)) => p,
                Some(Geometry::MultiPolygon(mut mp)) if mp.0.len() == 1 => mp.0.remove(0),
                _ => {
                    return Err(SiteError::Integrity {
                        id,
                        reason: "stored reservoir is not a single polygon".into(),
                    });
                }
            };
            let dam = match dam.geometry {
                Some(Geometry::MultiLineString(mls)) => mls,
                Some(Geometry::LineString(ls)) => geo::MultiLineString::new(vec![ls]),
                _ => {
                    return Err(SiteError::Integrity {
                        id,
                        reason: "stored dam is not a polyline".into(),
                    });
                }
            };
            store.insert(Candidate { record, reservoir, dam })?;
        }
        for id in dams.keys() {
            warn!("DAM_{} has no reservoir, dropped", id);
        }
        Ok(store)
    }
}

fn parse_id(index: &str, prefix: &str) -> Option<u32> {
    index.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiLineString, Polygon};
    use std::fs;

    fn candidate(id: u32) -> Candidate {
        let x = 138.0 + id as f64 * 0.01;
        Candidate {
            record: SiteRecord {
                id,
                latitude: -33.5,
                longitude: x,
                elevation_m: 410.0,
                water_area_ha: 12.5,
                ground_area_ha: 12.75,
                reservoir_volume_gl: 2.4,
                dam_length_m: 350.0,
                dam_area_ha: 1.1,
                dam_volume_gl: 0.2,
                water_rock_ratio: 12.0,
            },
            reservoir: Polygon::new(
                LineString::from(vec![(x, -33.5), (x + 0.005, -33.5), (x + 0.005, -33.49), (x, -33.5)]),
                vec![],
            ),
            dam: MultiLineString::new(vec![LineString::from(vec![(x, -33.5), (x + 0.005, -33.5)])]),
        }
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = CandidateStore::new();
        store.insert(candidate(3)).unwrap();
        assert!(matches!(store.insert(candidate(3)), Err(SiteError::DuplicateId(3))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_iteration_is_ordered() {
        let store = CandidateStore::from_candidates([candidate(9), candidate(2), candidate(5)]).unwrap();
        let ids: Vec<u32> = store.iter().map(Candidate::id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_ledger_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");

        let mut first = candidate(1).record;
        first.latitude = -33.0;
        first.longitude = 138.25;
        let mut ledger = Ledger::create(&path).unwrap();
        ledger.write(&first).unwrap();
        ledger.flush().unwrap();
        drop(ledger);

        let mut ledger = Ledger::append(&path).unwrap();
        ledger.write(&candidate(2).record).unwrap();
        ledger.flush().unwrap();
        drop(ledger);

        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        let first_row: Vec<&str> = rows[0].iter().collect();
        assert_eq!(
            first_row,
            vec!["RES_1", "-33.0   138.25", "410.0", "12.5", "12.75", "2.4", "350.0", "1.1", "0.2", "12.0"]
        );
        assert_eq!(&rows[1][0], "RES_2");

        // create truncates
        let ledger = Ledger::create(&path).unwrap();
        drop(ledger);
        assert!(fs::read_to_string(&path).unwrap().is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidates.geojson");
        let store = CandidateStore::from_candidates([candidate(4), candidate(1)]).unwrap();
        store.save(&path, CRS::wgs84()).unwrap();

        let back = CandidateStore::load(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.get(4), store.get(4));
        assert_eq!(back.get(1), store.get(1));
    }

    #[test]
    fn test_load_drops_unpaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidates.geojson");
        let features = vec![
            candidate(1).reservoir_feature(),
            candidate(1).dam_feature(),
            candidate(2).reservoir_feature(),
            candidate(3).dam_feature(),
        ];
        write_geojson(&path, &features, None).unwrap();

        let store = CandidateStore::load(&path).unwrap();
        let ids: Vec<u32> = store.iter().map(Candidate::id).collect();
        assert_eq!(ids, vec![1]);
    }
}
