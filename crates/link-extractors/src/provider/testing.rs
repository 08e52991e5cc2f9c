use std::time::Duration;

use async_trait::async_trait;
use link_cache::{MediaLink, Stream, Subtitle};
use reqwest::StatusCode;

use super::Provider;
use super::models::{Catalog, FilmInfo, FilmType, SearchResponse};
use crate::error::ExtractorError;
use crate::extractor::LinkSink;

/// What a [`FakeProvider`] does after pushing its links.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Ending {
    Finish,
    Fail,
    NotFound,
    Hang,
}

/// In-process provider with scripted links.
pub(crate) struct FakeProvider {
    pub id: String,
    pub catalogs: Vec<Catalog>,
    pub links: Vec<MediaLink>,
    pub delay: Duration,
    pub ending: Ending,
}

impl FakeProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            catalogs: Vec::new(),
            links: Vec::new(),
            delay: Duration::ZERO,
            ending: Ending::Finish,
        }
    }

    pub fn with_catalogs(mut self, names: &[&str]) -> Self {
        self.catalogs = names
            .iter()
            .map(|name| Catalog::new(&self.id, *name, format!("https://{}/{name}", self.id)))
            .collect();
        self
    }

    pub fn with_streams(mut self, urls: &[&str]) -> Self {
        self.links.extend(
            urls.iter()
                .map(|url| MediaLink::Stream(Stream::new("Server", *url))),
        );
        self
    }

    pub fn with_subtitle(mut self, url: &str, language: &str) -> Self {
        self.links
            .push(MediaLink::Subtitle(Subtitle::new(url, language)));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn ending(mut self, ending: Ending) -> Self {
        self.ending = ending;
        self
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn catalogs(&self) -> Vec<Catalog> {
        self.catalogs.clone()
    }

    async fn search(&self, _query: &str, page: u32) -> Result<SearchResponse, ExtractorError> {
        Ok(SearchResponse {
            items: Vec::new(),
            page,
            total_pages: 1,
        })
    }

    async fn film_info(&self, film_id: &str) -> Result<FilmInfo, ExtractorError> {
        Ok(FilmInfo {
            id: film_id.to_string(),
            title: film_id.to_string(),
            film_type: FilmType::TvShow,
            year: None,
            overview: None,
            poster: None,
            seasons: Vec::new(),
            provider_id: self.id.clone(),
        })
    }

    async fn source_links(
        &self,
        _film_id: &str,
        _season: Option<u32>,
        _episode: Option<u32>,
        sink: &LinkSink,
    ) -> Result<(), ExtractorError> {
        for link in &self.links {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if !sink.send(link.clone()).await {
                return Ok(());
            }
        }
        match self.ending {
            Ending::Finish => Ok(()),
            Ending::Fail => Err(ExtractorError::Blocked(StatusCode::FORBIDDEN)),
            Ending::NotFound => Err(ExtractorError::SourceNotFound),
            Ending::Hang => std::future::pending().await,
        }
    }
}
