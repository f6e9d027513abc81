use std::path::PathBuf;

use thiserror::Error;

/// Why a catalog load came back degraded. None of these are fatal: the
/// store keeps serving whatever rows could be read, possibly none.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogLoadError {
    #[error("catalog file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("malformed catalog data: {0}")]
    MalformedData(String),

    #[error("catalog is missing required columns: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is in use by an active scan session")]
    Busy,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
