use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("failed to open camera: {0}")]
    Open(String),

    #[error("failed to read frame: {0}")]
    Read(String),

    #[error("camera did not respond within {0:?}")]
    Timeout(Duration),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("catalog is empty; load products before scanning")]
    CatalogNotLoaded,

    #[error("camera open failed: {0}")]
    CameraOpen(#[source] CameraError),

    #[error("camera read failed: {0}")]
    CameraRead(#[source] CameraError),
}
