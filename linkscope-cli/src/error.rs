use link_extractors::ExtractorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error(transparent)]
    Extractor(#[from] ExtractorError),

    #[error("No streams found")]
    NoStreamsFound,

    #[error("Operation timed out")]
    Timeout,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    pub fn no_streams_found() -> Self {
        CliError::NoStreamsFound
    }

    pub fn timeout() -> Self {
        CliError::Timeout
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }
}
