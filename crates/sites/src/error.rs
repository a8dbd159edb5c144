//! Error types for site screening

use thiserror::Error;

/// Result type alias for site screening
pub type Result<T> = std::result::Result<T, SiteError>;

#[derive(Error, Debug)]
pub enum SiteError {
    /// Raster or geometry operation failed
    #[error("Engine error: {0}")]
    Engine(#[from] drygully_core::Error),

    /// A derived geometry broke an invariant it must hold
    #[error("Integrity violation for RES_{id}: {reason}")]
    Integrity { id: u32, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] csv::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Duplicate candidate id {0}")]
    DuplicateId(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<geojson::Error> for SiteError {
    fn from(e: geojson::Error) -> Self {
        SiteError::Export(e.to_string())
    }
}

impl From<serde_json::Error> for SiteError {
    fn from(e: serde_json::Error) -> Self {
        SiteError::Export(e.to_string())
    }
}

impl From<toml::de::Error> for SiteError {
    fn from(e: toml::de::Error) -> Self {
        SiteError::Config(e.to_string())
    }
}
