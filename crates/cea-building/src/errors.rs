//! ---
//! cea_section: "08-energy-models-optimization"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Error taxonomy for the building thermal model."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildingError>;

#[derive(Debug, Error)]
pub enum BuildingError {
    #[error("building {building}: invalid parameters: {reason}")]
    InvalidParameters { building: String, reason: String },
    #[error("building {building}: series has {found} steps, expected {expected}")]
    SeriesLengthMismatch {
        building: String,
        expected: usize,
        found: usize,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
