mod builder;
mod crypto;
mod models;
mod steganography;

pub use builder::{UpCloud, URL_REGEX, decrypt_sources};
pub use models::{EncodedSources, Source, SourcesResponse, Track};
pub use steganography::extract_key;
