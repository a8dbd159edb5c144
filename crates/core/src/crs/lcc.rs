//! Lambert conformal conic projection, two standard parallels (Snyder 1987, pp. 107-109)

use super::Ellipsoid;
use std::f64::consts::FRAC_PI_2;
use std::f64::consts::FRAC_PI_4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertConformal {
    a: f64,
    e: f64,
    lon0: f64,
    n: f64,
    f: f64,
    rho0: f64,
}

impl LambertConformal {
    /// Create from standard parallels, latitude/longitude of origin (degrees)
    pub fn new(lat1: f64, lat2: f64, lat0: f64, lon0: f64, ellipsoid: Ellipsoid) -> Self {
        let a = ellipsoid.a;
        let e = ellipsoid.e();
        let e2 = ellipsoid.e2();

        let (p0, p1, p2) = (lat0.to_radians(), lat1.to_radians(), lat2.to_radians());
        let m1 = m(p1, e2);
        let m2 = m(p2, e2);
        let t0 = t(p0, e);
        let t1 = t(p1, e);
        let t2 = t(p2, e);

        let n = if (lat1 - lat2).abs() < 1e-12 {
            p1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let f = m1 / (n * t1.powf(n));
        let rho0 = a * f * t0.powf(n);

        Self {
            a,
            e,
            lon0: lon0.to_radians(),
            n,
            f,
            rho0,
        }
    }

    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let rho = self.a * self.f * t(lat.to_radians(), self.e).powf(self.n);
        let theta = self.n * (lon.to_radians() - self.lon0);
        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dy = self.rho0 - y;
        let rho = x.hypot(dy).copysign(self.n);
        let theta = if self.n > 0.0 { x.atan2(dy) } else { (-x).atan2(-dy) };
        let t = (rho / (self.a * self.f)).powf(1.0 / self.n);

        let e = self.e;
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..30 {
            let es = e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
            let delta = next - phi;
            phi = next;
            if delta.abs() < 1e-13 {
                break;
            }
        }

        let lon = self.lon0 + theta / self.n;
        (lon.to_degrees(), phi.to_degrees())
    }
}

fn m(phi: f64, e2: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e2 * s * s).sqrt()
}

fn t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::parallel_radius;

    fn ga_lambert() -> LambertConformal {
        LambertConformal::new(-18.0, -36.0, 0.0, 134.0, Ellipsoid::GRS80)
    }

    #[test]
    fn origin_maps_to_zero() {
        let (x, y) = ga_lambert().forward(134.0, 0.0);
        assert!(x.abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn true_scale_on_standard_parallel() {
        let p = ga_lambert();
        let d = 0.001;
        let (x0, y0) = p.forward(140.0, -36.0);
        let (x1, y1) = p.forward(140.0 + d, -36.0);
        let projected = (x1 - x0).hypot(y1 - y0);
        let expected = parallel_radius(-36.0, Ellipsoid::GRS80) * d.to_radians();
        assert!((projected - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn inverse_roundtrip() {
        let p = ga_lambert();
        for &(lon, lat) in &[(115.9, -31.9), (134.0, -12.5), (147.3, -42.9)] {
            let (x, y) = p.forward(lon, lat);
            let (lon2, lat2) = p.inverse(x, y);
            assert!((lon2 - lon).abs() < 1e-9);
            assert!((lat2 - lat).abs() < 1e-9);
        }
    }
}
