//! Errors from rasters, projections and GeoTIFF I/O

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{height} rows x {width} cols does not match the data length")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Cell ({row}, {col}) is outside a {rows} x {cols} raster")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Rasters are not aligned: expected {er} x {ec}, got {ar} x {ac}")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Extent {0} does not overlap the raster")]
    EmptyWindow(String),

    #[error("Unsupported pixel type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
