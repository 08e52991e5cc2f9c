mod builder;

pub use builder::{MixDrop, URL_REGEX};
