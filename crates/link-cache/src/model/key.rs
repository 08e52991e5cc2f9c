//! # Cache Keys
//!
//! A cache entry is identified by `(provider, film, season, episode)`. The
//! string form is stable and used for logging and debugging:
//!
//! ```text
//! <providerId>::<filmId>-<season>:<episode>
//! ```
//!
//! Absent seasons and episodes render as the literal `null`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PROVIDER_SEPARATOR: &str = "::";
const SEASON_SEPARATOR: char = '-';
const EPISODE_SEPARATOR: char = ':';
const NULL_COMPONENT: &str = "null";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheKeyParseError {
    #[error("missing provider separator `::` in {0:?}")]
    MissingProvider(String),
    #[error("missing season separator `-` in {0:?}")]
    MissingSeason(String),
    #[error("missing episode separator `:` in {0:?}")]
    MissingEpisode(String),
    #[error("provider id {0:?} must not contain `:`")]
    InvalidProvider(String),
    #[error("invalid {field} component {value:?}")]
    InvalidComponent { field: &'static str, value: String },
}

/// Film-only projection of a [`CacheKey`], used to match any provider's
/// result for the same title and episode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FilmKey {
    pub film_id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl FilmKey {
    pub fn new(film_id: impl Into<String>, season: Option<u32>, episode: Option<u32>) -> Self {
        Self {
            film_id: film_id.into(),
            season,
            episode,
        }
    }

    /// Attach a provider to this key. `provider_id` must not contain `:`;
    /// use [`CacheKey::try_new`] for ids that are not known to be valid.
    pub fn with_provider(self, provider_id: impl Into<String>) -> CacheKey {
        let provider_id = provider_id.into();
        debug_assert!(
            validate_provider(&provider_id).is_ok(),
            "provider id {provider_id:?} contains `:`"
        );
        CacheKey {
            provider_id,
            film: self,
        }
    }
}

/// Identity of one cache entry.
///
/// Provider ids must not contain `:`; film ids may contain anything, since
/// parsing anchors the season and episode components from the right.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CacheKey {
    pub provider_id: String,
    film: FilmKey,
}

impl CacheKey {
    pub fn new(
        provider_id: impl Into<String>,
        film_id: impl Into<String>,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Self {
        FilmKey::new(film_id, season, episode).with_provider(provider_id)
    }

    /// Like [`new`](Self::new), but rejects provider ids that would not
    /// survive a format/parse round trip.
    pub fn try_new(
        provider_id: impl Into<String>,
        film_id: impl Into<String>,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Result<Self, CacheKeyParseError> {
        let provider_id = provider_id.into();
        validate_provider(&provider_id)?;
        Ok(Self {
            provider_id,
            film: FilmKey::new(film_id, season, episode),
        })
    }

    /// Key for a title without seasons or episodes.
    pub fn movie(provider_id: impl Into<String>, film_id: impl Into<String>) -> Self {
        Self::new(provider_id, film_id, None, None)
    }

    pub fn film_id(&self) -> &str {
        &self.film.film_id
    }

    pub fn season(&self) -> Option<u32> {
        self.film.season
    }

    pub fn episode(&self) -> Option<u32> {
        self.film.episode
    }

    pub fn film_key(&self) -> &FilmKey {
        &self.film
    }

    /// Same film/episode under another provider.
    pub fn for_provider(&self, provider_id: impl Into<String>) -> Self {
        self.film.clone().with_provider(provider_id)
    }
}

fn validate_provider(provider_id: &str) -> Result<(), CacheKeyParseError> {
    if provider_id.contains(EPISODE_SEPARATOR) {
        return Err(CacheKeyParseError::InvalidProvider(provider_id.to_string()));
    }
    Ok(())
}

fn write_component(f: &mut fmt::Formatter<'_>, value: Option<u32>) -> fmt::Result {
    match value {
        Some(value) => write!(f, "{value}"),
        None => f.write_str(NULL_COMPONENT),
    }
}

fn parse_component(field: &'static str, value: &str) -> Result<Option<u32>, CacheKeyParseError> {
    if value == NULL_COMPONENT {
        return Ok(None);
    }
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|_| CacheKeyParseError::InvalidComponent {
            field,
            value: value.to_string(),
        })
}

impl fmt::Display for FilmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEASON_SEPARATOR}", self.film_id)?;
        write_component(f, self.season)?;
        write!(f, "{EPISODE_SEPARATOR}")?;
        write_component(f, self.episode)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PROVIDER_SEPARATOR}{}", self.provider_id, self.film)
    }
}

impl FromStr for FilmKey {
    type Err = CacheKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, episode) = s
            .rsplit_once(EPISODE_SEPARATOR)
            .ok_or_else(|| CacheKeyParseError::MissingEpisode(s.to_string()))?;
        let (film_id, season) = rest
            .rsplit_once(SEASON_SEPARATOR)
            .ok_or_else(|| CacheKeyParseError::MissingSeason(s.to_string()))?;

        Ok(Self {
            film_id: film_id.to_string(),
            season: parse_component("season", season)?,
            episode: parse_component("episode", episode)?,
        })
    }
}

impl FromStr for CacheKey {
    type Err = CacheKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider_id, film) = s
            .split_once(PROVIDER_SEPARATOR)
            .ok_or_else(|| CacheKeyParseError::MissingProvider(s.to_string()))?;
        validate_provider(provider_id)?;
        Ok(film.parse::<FilmKey>()?.with_provider(provider_id))
    }
}

impl From<FilmKey> for String {
    fn from(key: FilmKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for FilmKey {
    type Error = CacheKeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for CacheKey {
    type Error = CacheKeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_canonical_key() {
        let key = CacheKey::new("flixhq", "tv/watch-the-flash-39535", Some(1), Some(1));
        assert_eq!(key.to_string(), "flixhq::tv/watch-the-flash-39535-1:1");

        let movie = CacheKey::movie("flixhq", "movie/watch-dune-12345");
        assert_eq!(movie.to_string(), "flixhq::movie/watch-dune-12345-null:null");
    }

    #[test]
    fn parse_inverts_format() {
        let samples = [
            CacheKey::new("flixhq", "tv/watch-the-flash-39535", Some(1), Some(1)),
            CacheKey::new("sflix", "movie/watch-dune-12345", None, None),
            CacheKey::new("p", "a:b-c::d", Some(0), None),
            CacheKey::new("p", "", None, Some(42)),
            CacheKey::new("p", "null-null:null", Some(u32::MAX), Some(7)),
        ];

        for key in samples {
            let parsed: CacheKey = key.to_string().parse().unwrap();
            assert_eq!(parsed, key, "round trip of {key}");
        }
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(matches!(
            "flixhq/film-1:1".parse::<CacheKey>(),
            Err(CacheKeyParseError::MissingProvider(_))
        ));
        assert!(matches!(
            "flixhq::film:1".parse::<CacheKey>(),
            Err(CacheKeyParseError::MissingSeason(_))
        ));
        assert!(matches!(
            "flixhq::film-1".parse::<CacheKey>(),
            Err(CacheKeyParseError::MissingEpisode(_))
        ));
        assert!(matches!(
            "flixhq::film-one:1".parse::<CacheKey>(),
            Err(CacheKeyParseError::InvalidComponent { field: "season", .. })
        ));
        assert!(matches!(
            "a:b::film-1:1".parse::<CacheKey>(),
            Err(CacheKeyParseError::InvalidProvider(_))
        ));
    }

    #[test]
    fn provider_ids_with_colons_are_rejected() {
        // "a:" would format as "a:::film-1:1" and parse back with provider "a".
        assert_eq!(
            CacheKey::try_new("a:", "film", Some(1), Some(1)),
            Err(CacheKeyParseError::InvalidProvider("a:".to_string()))
        );
        assert!(CacheKey::try_new("a::b", "film", None, None).is_err());

        let key = CacheKey::try_new("flixhq", "tv:odd-name", Some(1), Some(1)).unwrap();
        assert_eq!(key, CacheKey::new("flixhq", "tv:odd-name", Some(1), Some(1)));
        assert_eq!(key.to_string().parse::<CacheKey>().unwrap(), key);
    }

    #[test]
    fn film_projection_ignores_provider() {
        let a = CacheKey::new("flixhq", "tv/watch-the-flash-39535", Some(2), Some(3));
        let b = a.for_provider("sflix");

        assert_ne!(a, b);
        assert_eq!(a.film_key(), b.film_key());
        assert_eq!(a.film_key().to_string(), "tv/watch-the-flash-39535-2:3");
    }

    #[test]
    fn serializes_as_string() {
        let key = CacheKey::new("flixhq", "tv/watch-the-flash-39535", Some(1), Some(1));
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"flixhq::tv/watch-the-flash-39535-1:1\"");

        let back: CacheKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
