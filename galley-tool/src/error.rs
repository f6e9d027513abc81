use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] galley_core::CatalogError),

    #[error("History error: {0}")]
    History(#[from] galley_core::HistoryError),

    #[error("Publisher error: {0}")]
    Publish(#[from] galley_api::PublishError),

    #[error("Camera error: {0}")]
    Camera(#[from] galley_scan::CameraError),

    #[error("Scan error: {0}")]
    Scan(#[from] galley_scan::ScanError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
