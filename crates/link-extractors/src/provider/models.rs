use link_cache::Episode;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FilmType {
    Movie,
    TvShow,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FilmSearchItem {
    pub id: String,
    pub title: String,
    pub film_type: FilmType,
    pub year: Option<u32>,
    pub poster: Option<String>,
    pub provider_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    pub items: Vec<FilmSearchItem>,
    pub page: u32,
    pub total_pages: u32,
}

impl SearchResponse {
    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Season {
    pub number: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FilmInfo {
    pub id: String,
    pub title: String,
    pub film_type: FilmType,
    pub year: Option<u32>,
    pub overview: Option<String>,
    pub poster: Option<String>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    pub provider_id: String,
}

impl FilmInfo {
    pub fn is_movie(&self) -> bool {
        self.film_type == FilmType::Movie
    }
}

/// A browsable list exposed by a provider, e.g. "Trending" or "Latest TV".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Catalog {
    pub provider_id: String,
    pub name: String,
    pub url: String,
}

impl Catalog {
    pub fn new(
        provider_id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}
