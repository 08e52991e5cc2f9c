use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::key::CacheKey;
use super::stream::{MediaLink, Stream, Subtitle};

/// Episode a cache entry belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Episode {
    pub id: String,
    pub season: u32,
    pub number: u32,
    pub title: Option<String>,
}

/// Links discovered for one film or episode from one provider.
///
/// Streams and subtitles are sets: appending an item equal to one already
/// present is a no-op, whatever the order or interleaving of the callers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CachedLinks {
    pub watch_id: String,
    pub provider_id: String,
    pub thumbnail: Option<String>,
    pub episode: Option<Episode>,
    pub streams: BTreeSet<Stream>,
    pub subtitles: BTreeSet<Subtitle>,
}

impl CachedLinks {
    pub fn new(watch_id: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            watch_id: watch_id.into(),
            provider_id: provider_id.into(),
            thumbnail: None,
            episode: None,
            streams: BTreeSet::new(),
            subtitles: BTreeSet::new(),
        }
    }

    /// Empty entry whose identity is taken from `key`.
    pub fn for_key(key: &CacheKey) -> Self {
        Self::new(key.film_id(), key.provider_id.as_str())
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_episode(mut self, episode: Episode) -> Self {
        self.episode = Some(episode);
        self
    }

    /// Returns `true` if the stream was not present yet.
    pub fn append_stream(&mut self, stream: Stream) -> bool {
        self.streams.insert(stream)
    }

    /// Returns `true` if the subtitle was not present yet.
    pub fn append_subtitle(&mut self, subtitle: Subtitle) -> bool {
        self.subtitles.insert(subtitle)
    }

    pub fn append(&mut self, link: MediaLink) -> bool {
        match link {
            MediaLink::Stream(stream) => self.append_stream(stream),
            MediaLink::Subtitle(subtitle) => self.append_subtitle(subtitle),
        }
    }

    /// Set union with `other`; returns `true` if anything was added.
    pub fn merge(&mut self, other: CachedLinks) -> bool {
        let before = (self.streams.len(), self.subtitles.len());
        self.streams.extend(other.streams);
        self.subtitles.extend(other.subtitles);
        if self.thumbnail.is_none() {
            self.thumbnail = other.thumbnail;
        }
        if self.episode.is_none() {
            self.episode = other.episode;
        }
        before != (self.streams.len(), self.subtitles.len())
    }

    pub fn has_no_stream_links(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(name: &str) -> Stream {
        Stream::new(name, format!("https://cdn.example/{name}.m3u8"))
    }

    #[test]
    fn append_has_set_semantics() {
        let mut links = CachedLinks::new("39535", "flixhq");
        assert!(links.has_no_stream_links());

        assert!(links.append_stream(stream("a")));
        assert!(!links.append_stream(stream("a")));
        assert!(links.append_subtitle(Subtitle::new("https://cdn.example/en.vtt", "English")));
        assert!(!links.append(Subtitle::new("https://cdn.example/en.vtt", "English").into()));

        assert_eq!(links.stream_count(), 1);
        assert_eq!(links.subtitles.len(), 1);
        assert!(!links.has_no_stream_links());
    }

    #[test]
    fn merge_is_a_union() {
        let mut a = CachedLinks::new("39535", "flixhq");
        a.append_stream(stream("a"));
        a.append_stream(stream("b"));

        let mut b = CachedLinks::new("39535", "flixhq").with_thumbnail("https://img.example/t.jpg");
        b.append_stream(stream("b"));
        b.append_stream(stream("c"));

        assert!(a.merge(b.clone()));
        assert_eq!(a.stream_count(), 3);
        assert_eq!(a.thumbnail.as_deref(), Some("https://img.example/t.jpg"));
        assert!(!a.merge(b));
    }

    #[test]
    fn entry_for_key_takes_identity_from_key() {
        let key = CacheKey::new("flixhq", "tv/watch-the-flash-39535", Some(1), Some(1));
        let links = CachedLinks::for_key(&key);
        assert_eq!(links.provider_id, "flixhq");
        assert_eq!(links.watch_id, "tv/watch-the-flash-39535");
        assert!(links.has_no_stream_links());
    }
}
