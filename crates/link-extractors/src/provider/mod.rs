//! Source providers: catalogs of films that resolve a film/episode into
//! links by delegating to embed-host extractors.

use async_trait::async_trait;

use crate::error::ExtractorError;
use crate::extractor::LinkSink;

pub mod catalog;
pub mod models;
pub mod registry;

use models::{Catalog, FilmInfo, SearchResponse};

#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, used as the provider part of cache keys.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn catalogs(&self) -> Vec<Catalog> {
        Vec::new()
    }

    async fn search(&self, query: &str, page: u32) -> Result<SearchResponse, ExtractorError>;

    async fn film_info(&self, film_id: &str) -> Result<FilmInfo, ExtractorError>;

    /// Pushes every stream and subtitle found for the film (or one of its
    /// episodes) into `sink` as soon as it is known.
    async fn source_links(
        &self,
        film_id: &str,
        season: Option<u32>,
        episode: Option<u32>,
        sink: &LinkSink,
    ) -> Result<(), ExtractorError>;
}

#[cfg(test)]
pub(crate) mod testing;
