//! # Link Extractors
//!
//! Source providers and embed-host extractors that discover playable streams
//! and subtitles and feed them, one at a time, into a
//! [`CachedLinksRepository`](link_cache::CachedLinksRepository).
//!
//! ## Features
//!
//! - `Extractor`/`EmbedExtractor` contracts with incremental, channel-based results
//! - UpCloud-style extraction: AES key hidden in a PNG, OpenSSL-format AES payload
//! - MixDrop-style extraction: packed JavaScript unpacking and marker scanning
//! - Provider registry with cross-provider catalog aggregation
//! - Per-provider, cancellable load orchestration with error isolation
//!
//! ## License
//!
//! MIT OR Apache-2.0

pub mod default;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod provider;
pub mod utils;

pub use default::{ClientConfig, ProxyConfig, create_client, default_client, default_factory};
pub use error::{ErrorKind, ExtractorError};
pub use extractor::{
    AnyExtractor, EmbedExtractor, Extractor, LinkSink, factory::ExtractorFactory, link_channel,
};
pub use loader::{LinkLoader, LinkRequest, LoadHandle, LoadStatus, LoaderConfig, ProviderOutcome};
pub use provider::{
    Provider, catalog::CatalogAggregator, models::*, registry::ProviderRegistry,
};
