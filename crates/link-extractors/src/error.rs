use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("host blocked the request with status {0}")]
    Blocked(StatusCode),
    #[error("request timed out")]
    Timeout,
    #[error("tls error: {0}")]
    Tls(String),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("image error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("key decoding error: {0}")]
    KeyDecoding(String),
    #[error("decryption error: {0}")]
    Decryption(String),
    #[error("unpack error: {0}")]
    Unpack(String),
    #[error("source not found")]
    SourceNotFound,
    #[error("unsupported extractor")]
    UnsupportedExtractor,
    #[error("provider not found: {0}")]
    ProviderNotFound(String),
    #[error("other error: {0}")]
    Other(String),
}

/// Coarse classification used when reporting per-provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Decryption,
    NotFound,
    Other,
}

impl ExtractorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractorError::HttpError(_)
            | ExtractorError::Blocked(_)
            | ExtractorError::Timeout
            | ExtractorError::Tls(_) => ErrorKind::Network,
            ExtractorError::ImageError(_)
            | ExtractorError::KeyDecoding(_)
            | ExtractorError::Decryption(_)
            | ExtractorError::Unpack(_)
            | ExtractorError::JsonError(_) => ErrorKind::Decryption,
            ExtractorError::SourceNotFound => ErrorKind::NotFound,
            ExtractorError::InvalidUrl(_)
            | ExtractorError::UnsupportedExtractor
            | ExtractorError::ProviderNotFound(_)
            | ExtractorError::Other(_) => ErrorKind::Other,
        }
    }

    /// Maps a non-success HTTP status to the matching error, if any.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => Some(ExtractorError::SourceNotFound),
            StatusCode::FORBIDDEN
            | StatusCode::UNAUTHORIZED
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE => Some(ExtractorError::Blocked(status)),
            s if s.is_success() => None,
            s => Some(ExtractorError::Other(format!("unexpected status {s}"))),
        }
    }
}
