//! Cell value types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// A value a raster cell can hold.
///
/// Elevation and slope layers are `f64` with NaN as no-data, flow
/// direction and masks are `u8` codes, watershed labels are `i32`.
pub trait RasterElement:
    Copy + Debug + PartialOrd + NumCast + Zero + Send + Sync + 'static
{
    /// Fallback for values that cannot be represented in this type
    fn default_nodata() -> Self;

    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

impl RasterElement for u8 {
    fn default_nodata() -> Self {
        0
    }

    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        nodata == Some(*self)
    }
}

impl RasterElement for i32 {
    fn default_nodata() -> Self {
        i32::MIN
    }

    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        nodata == Some(*self)
    }
}

impl RasterElement for f64 {
    fn default_nodata() -> Self {
        f64::NAN
    }

    /// NaN is always no-data; an explicit value matches within a few ULPs
    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        if self.is_nan() {
            return true;
        }
        nodata.is_some_and(|nd| !nd.is_nan() && (self - nd).abs() < f64::EPSILON * 100.0)
    }
}
