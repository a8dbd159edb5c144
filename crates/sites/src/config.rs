//! Screening configuration
//!
//! Loaded from TOML; every field has a default so an empty file is a valid
//! configuration.
//!
//! ```
//! use drygully_sites::config::{Config, ScreenRange};
//!
//! let config = Config::from_toml_str(r#"
//!     output_dir = "out"
//!
//!     [screen]
//!     max_dam_height = 30
//!     range = [4, 8, 15]
//! "#).unwrap();
//!
//! assert_eq!(config.screen.max_dam_height, 30.0);
//! assert_eq!(config.screen.min_reservoir_cells, 111);
//! assert_eq!(config.screen.range, ScreenRange::Ids(vec![4, 8, 15]));
//! ```

use crate::error::{Result, SiteError};
use drygully_core::CRS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub inputs: InputPaths,
    pub screen: ScreenParams,
    pub overlap: OverlapParams,
    pub pretty: PrettyParams,
    pub crs: CrsConfig,
    pub output_dir: PathBuf,
}

/// Input files. Flow direction and slope are derived from the DEM when
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub dem: Option<PathBuf>,
    pub flow_direction: Option<PathBuf>,
    pub slope: Option<PathBuf>,
    pub points: Option<PathBuf>,
}

/// Which pour points to evaluate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr", into = "RangeRepr")]
pub enum ScreenRange {
    #[default]
    All,
    Ids(Vec<u32>),
}

impl ScreenRange {
    pub fn includes(&self, id: u32) -> bool {
        match self {
            ScreenRange::All => true,
            ScreenRange::Ids(ids) => ids.contains(&id),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RangeRepr {
    Keyword(String),
    Ids(Vec<u32>),
}

impl TryFrom<RangeRepr> for ScreenRange {
    type Error = String;

    fn try_from(repr: RangeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            RangeRepr::Keyword(k) if k.eq_ignore_ascii_case("all") => Ok(ScreenRange::All),
            RangeRepr::Keyword(k) => Err(format!("unknown range '{}', expected \"all\" or a list of ids", k)),
            RangeRepr::Ids(ids) => Ok(ScreenRange::Ids(ids)),
        }
    }
}

impl From<ScreenRange> for RangeRepr {
    fn from(range: ScreenRange) -> Self {
        match range {
            ScreenRange::All => RangeRepr::Keyword("all".into()),
            ScreenRange::Ids(ids) => RangeRepr::Ids(ids),
        }
    }
}

/// Elevation the reservoir depth is measured from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthReference {
    /// Mean elevation under the dam line
    #[default]
    DamMean,
    /// Mean elevation of the reservoir body
    ReservoirMean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenParams {
    /// Dam crest height above the lowest watershed cell (m)
    pub max_dam_height: f64,
    pub min_reservoir_cells: usize,
    /// Horizontal run per unit of dam height
    pub dam_batter: f64,
    pub range: ScreenRange,
    /// Half width of the processing window around each point (degrees)
    pub window_half_size: f64,
    pub depth_reference: DepthReference,
}

impl Default for ScreenParams {
    fn default() -> Self {
        Self {
            max_dam_height: 40.0,
            min_reservoir_cells: 111,
            dam_batter: 1.0,
            range: ScreenRange::All,
            window_half_size: 0.05,
            depth_reference: DepthReference::DamMean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapParams {
    /// Pour points further apart than this in latitude or longitude never
    /// conflict (degrees)
    pub threshold_deg: f64,
}

impl Default for OverlapParams {
    fn default() -> Self {
        Self { threshold_deg: 0.02 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrettyParams {
    pub dam_buffer_m: f64,
    pub smooth_tolerance_m: f64,
    pub kml: bool,
}

impl Default for PrettyParams {
    fn default() -> Self {
        Self {
            dam_buffer_m: 15.0,
            smooth_tolerance_m: 90.0,
            kml: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrsConfig {
    pub source_epsg: u32,
    pub projected_epsg: u32,
}

impl Default for CrsConfig {
    fn default() -> Self {
        Self {
            source_epsg: 4326,
            projected_epsg: 3577,
        }
    }
}

impl CrsConfig {
    pub fn source(&self) -> CRS {
        CRS::from_epsg(self.source_epsg)
    }

    pub fn projected(&self) -> CRS {
        CRS::from_epsg(self.projected_epsg)
    }
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SiteError::Config(msg));
        let s = &self.screen;

        if !(s.max_dam_height > 0.0 && s.max_dam_height.is_finite()) {
            return invalid(format!("max_dam_height must be positive, got {}", s.max_dam_height));
        }
        if !(s.dam_batter >= 0.0 && s.dam_batter.is_finite()) {
            return invalid(format!("dam_batter must be non-negative, got {}", s.dam_batter));
        }
        if !(s.window_half_size > 0.0) {
            return invalid(format!("window_half_size must be positive, got {}", s.window_half_size));
        }
        if let ScreenRange::Ids(ids) = &s.range {
            let unique: BTreeSet<_> = ids.iter().collect();
            if unique.len() != ids.len() {
                return invalid("range lists an id more than once".into());
            }
        }
        if !(self.overlap.threshold_deg > 0.0) {
            return invalid(format!("threshold_deg must be positive, got {}", self.overlap.threshold_deg));
        }
        if !(self.pretty.dam_buffer_m > 0.0) {
            return invalid(format!("dam_buffer_m must be positive, got {}", self.pretty.dam_buffer_m));
        }
        if !(self.pretty.smooth_tolerance_m >= 0.0) {
            return invalid(format!(
                "smooth_tolerance_m must be non-negative, got {}",
                self.pretty.smooth_tolerance_m
            ));
        }

        let source = self.crs.source();
        if !source.is_geographic() {
            return invalid(format!("source CRS {} must be geographic", source));
        }
        let projected = self.crs.projected();
        if projected.is_geographic() || projected.projection().is_err() {
            return invalid(format!("projected CRS {} is not supported", projected));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.screen.max_dam_height, 40.0);
        assert_eq!(config.screen.min_reservoir_cells, 111);
        assert_eq!(config.screen.dam_batter, 1.0);
        assert_eq!(config.screen.range, ScreenRange::All);
        assert_eq!(config.overlap.threshold_deg, 0.02);
        assert_eq!(config.pretty.dam_buffer_m, 15.0);
        assert_eq!(config.crs.projected_epsg, 3577);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_file() {
        let toml = r#"
            output_dir = "results"

            [inputs]
            dem = "dem.tif"
            points = "points.csv"

            [screen]
            max_dam_height = 60.0
            range = "all"
            depth_reference = "reservoir_mean"

            [overlap]
            threshold_deg = 0.05

            [pretty]
            kml = false

            [crs]
            projected_epsg = 3112
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("results"));
        assert_eq!(config.inputs.dem, Some(PathBuf::from("dem.tif")));
        assert!(config.inputs.slope.is_none());
        assert_eq!(config.screen.depth_reference, DepthReference::ReservoirMean);
        assert_eq!(config.screen.max_dam_height, 60.0);
        assert!(!config.pretty.kml);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_range_keyword_and_ids() {
        let config = Config::from_toml_str("[screen]\nrange = [3, 1]").unwrap();
        assert!(config.screen.range.includes(3));
        assert!(!config.screen.range.includes(2));
        assert!(Config::from_toml_str("[screen]\nrange = \"some\"").is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.screen.max_dam_height = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.screen.dam_batter = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.crs.projected_epsg = 32755;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.crs.source_epsg = 3577;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.screen.range = ScreenRange::Ids(vec![1, 1]);
        assert!(config.validate().is_err());
    }
}
