use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Region registry unavailable: {0}")]
    RegistryLoad(String),

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Upstream snapshot malformed: {0}")]
    UpstreamFormat(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Geocoding error: {0}")]
    Geocode(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
