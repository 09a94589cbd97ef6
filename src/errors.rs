use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Map config parse error: {0}")]
    ConfigParse(String),

    #[error("Gate count mismatch: {gates} gates for {elements} binding elements")]
    GateCountMismatch { gates: usize, elements: usize },

    #[error("Image load error: {0}")]
    ImageLoad(String),

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("DOM error: {0}")]
    Dom(String),

    #[error("Invalid map state: {0}")]
    InvalidState(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type MapResult<T> = Result<T, MapError>;
