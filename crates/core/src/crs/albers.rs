//! Albers equal-area conic projection on the ellipsoid (Snyder 1987, pp. 101-102)

use super::Ellipsoid;

/// Albers equal-area conic with two standard parallels.
///
/// Areas measured in projected metres equal true ellipsoidal areas, which
/// is what reservoir surface areas need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlbersEqualArea {
    a: f64,
    e: f64,
    e2: f64,
    lon0: f64,
    n: f64,
    c: f64,
    rho0: f64,
}

impl AlbersEqualArea {
    /// Create from standard parallels, latitude/longitude of origin (degrees)
    pub fn new(lat1: f64, lat2: f64, lat0: f64, lon0: f64, ellipsoid: Ellipsoid) -> Self {
        let a = ellipsoid.a;
        let e2 = ellipsoid.e2();
        let e = ellipsoid.e();

        let m1 = m(lat1.to_radians(), e2);
        let m2 = m(lat2.to_radians(), e2);
        let q0 = q(lat0.to_radians(), e, e2);
        let q1 = q(lat1.to_radians(), e, e2);
        let q2 = q(lat2.to_radians(), e, e2);

        let n = if (lat1 - lat2).abs() < 1e-12 {
            lat1.to_radians().sin()
        } else {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };
        let c = m1 * m1 + n * q1;
        let rho0 = a * (c - n * q0).sqrt() / n;

        Self {
            a,
            e,
            e2,
            lon0: lon0.to_radians(),
            n,
            c,
            rho0,
        }
    }

    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let q = q(lat.to_radians(), self.e, self.e2);
        let rho = self.a * (self.c - self.n * q).max(0.0).sqrt() / self.n;
        let theta = self.n * (lon.to_radians() - self.lon0);
        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dy = self.rho0 - y;
        let rho = x.hypot(dy).copysign(self.n);
        let theta = if self.n > 0.0 { x.atan2(dy) } else { (-x).atan2(-dy) };
        let rn_a = rho * self.n / self.a;
        let q = (self.c - rn_a * rn_a) / self.n;

        let lat = self.latitude_from_q(q);
        let lon = self.lon0 + theta / self.n;
        (lon.to_degrees(), lat.to_degrees())
    }

    /// Invert q(phi) by Newton-style iteration (Snyder eq. 3-16)
    fn latitude_from_q(&self, q: f64) -> f64 {
        let e = self.e;
        let e2 = self.e2;
        let mut phi = (q / 2.0).clamp(-1.0, 1.0).asin();

        for _ in 0..30 {
            let s = phi.sin();
            let es = e * s;
            let one_minus = 1.0 - e2 * s * s;
            let delta = one_minus * one_minus / (2.0 * phi.cos())
                * (q / (1.0 - e2) - s / one_minus + ((1.0 - es) / (1.0 + es)).ln() / (2.0 * e));
            phi += delta;
            if delta.abs() < 1e-13 {
                break;
            }
        }
        phi
    }
}

fn m(phi: f64, e2: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e2 * s * s).sqrt()
}

fn q(phi: f64, e: f64, e2: f64) -> f64 {
    let s = phi.sin();
    let es = e * s;
    (1.0 - e2) * (s / (1.0 - e2 * s * s) - ((1.0 - es) / (1.0 + es)).ln() / (2.0 * e))
}
