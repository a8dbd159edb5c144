//! Coordinate Reference System handling
//!
//! Pure-Rust map projections (Snyder 1987, USGS Prof. Paper 1395), so that
//! areas and lengths can be measured in metres without linking libproj.
//!
//! Supported:
//! - EPSG:4326 / EPSG:4283: geographic longitude/latitude (identity)
//! - EPSG:3577: GDA94 Australian Albers (equal-area conic)
//! - EPSG:3112: GDA94 Geoscience Australia Lambert (conformal conic)

mod albers;
mod lcc;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use albers::AlbersEqualArea;
pub use lcc::LambertConformal;

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (m)
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid { a: 6_378_137.0, f: 1.0 / 298.257_223_563 };
    pub const GRS80: Ellipsoid = Ellipsoid { a: 6_378_137.0, f: 1.0 / 298.257_222_101 };

    /// First eccentricity squared
    pub fn e2(&self) -> f64 {
        2.0 * self.f - self.f * self.f
    }

    /// First eccentricity
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }
}

/// Coordinate Reference System, identified by EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// GDA94 Australian Albers (EPSG:3577)
    pub fn australian_albers() -> Self {
        Self::from_epsg(3577)
    }

    /// GDA94 Geoscience Australia Lambert (EPSG:3112)
    pub fn australia_lambert() -> Self {
        Self::from_epsg(3112)
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg, 4326 | 4283)
    }

    /// Projection mapping geographic degrees into this CRS
    pub fn projection(&self) -> Result<Projection> {
        match self.epsg {
            4326 | 4283 => Ok(Projection::Geographic),
            3577 => Ok(Projection::Albers(AlbersEqualArea::new(
                -18.0,
                -36.0,
                0.0,
                132.0,
                Ellipsoid::GRS80,
            ))),
            3112 => Ok(Projection::Lambert(LambertConformal::new(
                -18.0,
                -36.0,
                0.0,
                134.0,
                Ellipsoid::GRS80,
            ))),
            other => Err(Error::UnsupportedCrs(format!("EPSG:{}", other))),
        }
    }

    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

/// A map projection from geographic degrees to planar metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Identity: coordinates stay in degrees
    Geographic,
    Albers(AlbersEqualArea),
    Lambert(LambertConformal),
}

impl Projection {
    /// Project `(longitude, latitude)` in degrees to `(x, y)`
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (lon, lat),
            Projection::Albers(p) => p.forward(lon, lat),
            Projection::Lambert(p) => p.forward(lon, lat),
        }
    }

    /// Unproject `(x, y)` to `(longitude, latitude)` in degrees
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (x, y),
            Projection::Albers(p) => p.inverse(x, y),
            Projection::Lambert(p) => p.inverse(x, y),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Projection::Geographic)
    }
}

/// Radius of the parallel at `lat_deg` on the ellipsoid, in metres.
///
/// Length of one radian of longitude along that parallel.
pub fn parallel_radius(lat_deg: f64, ellipsoid: Ellipsoid) -> f64 {
    let phi = lat_deg.to_radians();
    let s = phi.sin();
    ellipsoid.a * phi.cos() / (1.0 - ellipsoid.e2() * s * s).sqrt()
}

/// Meridional radius of curvature at `lat_deg`, in metres per radian.
pub fn meridian_radius(lat_deg: f64, ellipsoid: Ellipsoid) -> f64 {
    let phi = lat_deg.to_radians();
    let s = phi.sin();
    let e2 = ellipsoid.e2();
    ellipsoid.a * (1.0 - e2) / (1.0 - e2 * s * s).powf(1.5)
}
