pub mod key;
pub mod links;
pub mod stream;

pub use key::{CacheKey, CacheKeyParseError, FilmKey};
pub use links::{CachedLinks, Episode};
pub use stream::{Flag, MediaLink, Stream, StreamFormat, Subtitle};
