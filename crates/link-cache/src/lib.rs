//! # Link Cache
//!
//! In-memory cache of playable links (streams and subtitles) discovered by
//! source providers, keyed by provider, film, season and episode.
//!
//! ## Features
//!
//! - Canonical, round-trippable `CacheKey` encoding
//! - Set semantics for streams and subtitles, so racing extractors never
//!   produce duplicates
//! - Per-key observation streams with replay-latest semantics
//! - Lazy, read-side expiry filtering of signed stream URLs
//! - Observable list/map collections emitting `Add`/`Remove` operations
//!
//! ## License
//!
//! MIT OR Apache-2.0

pub mod expiry;
pub mod model;
pub mod observable;
pub mod repository;

pub use expiry::filter_out_expired_links;
pub use model::{
    CacheKey, CacheKeyParseError, CachedLinks, Episode, FilmKey, Flag, MediaLink, Stream,
    StreamFormat, Subtitle,
};
pub use observable::{
    CollectionsOperationHandler, ListOperation, MapOperation, ObservableList, ObservableMap,
    spawn_operation_handler,
};
pub use repository::{CacheObservation, CacheSnapshot, CachedLinksRepository, RepositoryConfig};
