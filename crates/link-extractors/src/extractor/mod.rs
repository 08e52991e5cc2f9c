//! Extraction contracts.
//!
//! Extractors never return links in one batch. They push each discovered
//! stream or subtitle into a [`LinkSink`] as soon as it is known, so the first
//! usable stream reaches the cache before slower servers answer. Pushing the
//! same link twice is harmless: the cache has set semantics.
//!
//! "No results" is `Ok(())` with nothing pushed. Errors are reserved for
//! exceptional conditions: blocked host, malformed response, failed decryption.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use url::Url;

use crate::error::ExtractorError;

pub mod client;
pub mod factory;
pub mod hosts;
mod sink;
#[cfg(test)]
pub(crate) mod testing;

pub use client::HostClient;
pub use sink::{LinkSink, link_channel};

/// Extractor for a host serving a known media/episode pair.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    fn host(&self) -> &str;

    async fn extract(
        &self,
        url: &Url,
        media_id: &str,
        episode_id: Option<&str>,
        sink: &LinkSink,
    ) -> Result<(), ExtractorError>;
}

/// Extractor for an arbitrary embed page.
#[async_trait]
pub trait EmbedExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn host(&self) -> &str;

    async fn extract_embed(
        &self,
        url: &Url,
        headers: &HeaderMap,
        sink: &LinkSink,
    ) -> Result<(), ExtractorError>;
}

/// Either flavor of extractor, as resolved by the factory.
#[derive(Clone)]
pub enum AnyExtractor {
    Standard(Arc<dyn Extractor>),
    Embed(Arc<dyn EmbedExtractor>),
}

impl AnyExtractor {
    pub fn name(&self) -> &str {
        match self {
            AnyExtractor::Standard(extractor) => extractor.name(),
            AnyExtractor::Embed(extractor) => extractor.name(),
        }
    }

    pub fn host(&self) -> &str {
        match self {
            AnyExtractor::Standard(extractor) => extractor.host(),
            AnyExtractor::Embed(extractor) => extractor.host(),
        }
    }

    /// Runs the extractor against `url`. Standard extractors take their media
    /// id from the last path segment of the URL.
    pub async fn extract(
        &self,
        url: &Url,
        headers: &HeaderMap,
        sink: &LinkSink,
    ) -> Result<(), ExtractorError> {
        match self {
            AnyExtractor::Standard(extractor) => {
                let media_id = url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .filter(|segment| !segment.is_empty())
                    .ok_or_else(|| ExtractorError::InvalidUrl(url.to_string()))?;
                extractor.extract(url, media_id, None, sink).await
            }
            AnyExtractor::Embed(extractor) => extractor.extract_embed(url, headers, sink).await,
        }
    }
}

impl std::fmt::Debug for AnyExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyExtractor")
            .field("name", &self.name())
            .field("host", &self.host())
            .finish()
    }
}
