use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
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

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Resolver error: {0}")]
    Resolver(String),

    #[error("Selector error: {0}")]
    Selector(String),

    #[error("Source '{source_id}' failed: {message}")]
    Source { source_id: String, message: String },

    #[error("Source '{0}' timed out")]
    Timeout(String),

    #[error("No source produced any events ({0} attempted)")]
    NoSources(usize),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
