use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::Client;

use super::AnyExtractor;
use super::hosts::{self, mixdrop::MixDrop, upcloud::UpCloud};
use crate::error::ExtractorError;

// A type alias for a thread-safe constructor function.
type ExtractorConstructor = fn(Client) -> AnyExtractor;

struct HostEntry {
    name: &'static str,
    regex: &'static LazyLock<Regex>,
    constructor: ExtractorConstructor,
}

// Macro to create a constructor function for a given host
macro_rules! create_constructor {
    ($name:ident, $variant:ident, $builder:expr) => {
        fn $name(client: Client) -> AnyExtractor {
            AnyExtractor::$variant(Arc::new($builder(client)))
        }
    };
}

create_constructor!(new_upcloud, Standard, UpCloud::new);
create_constructor!(new_mixdrop, Embed, MixDrop::new);

// Static host registry
static HOSTS: &[HostEntry] = &[
    HostEntry {
        name: UpCloud::NAME,
        regex: &hosts::upcloud::URL_REGEX,
        constructor: new_upcloud,
    },
    HostEntry {
        name: MixDrop::NAME,
        regex: &hosts::mixdrop::URL_REGEX,
        constructor: new_mixdrop,
    },
];

/// A factory for creating host-specific extractors.
pub struct ExtractorFactory {
    client: Client,
}

impl ExtractorFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn create_extractor(&self, url: &str) -> Result<AnyExtractor, ExtractorError> {
        for host in HOSTS {
            if host.regex.is_match(url) {
                return Ok((host.constructor)(self.client.clone()));
            }
        }
        Err(ExtractorError::UnsupportedExtractor)
    }

    /// Names of every host the factory can build an extractor for.
    pub fn supported_hosts(&self) -> Vec<&'static str> {
        HOSTS.iter().map(|host| host.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_resolve_to_their_extractor() {
        let factory = ExtractorFactory::new(Client::new());

        let upcloud = factory
            .create_extractor("https://rabbitstream.net/v2/embed-4/Xb1cDe2FgH3?z=")
            .unwrap();
        assert!(matches!(upcloud, AnyExtractor::Standard(_)));
        assert_eq!(upcloud.name(), "UpCloud");

        let mixdrop = factory
            .create_extractor("https://mixdrop.co/e/abc123")
            .unwrap();
        assert!(matches!(mixdrop, AnyExtractor::Embed(_)));
        assert_eq!(mixdrop.host(), "mixdrop.co");
    }

    #[test]
    fn unknown_host_is_unsupported() {
        let factory = ExtractorFactory::new(Client::new());
        assert!(matches!(
            factory.create_extractor("https://example.com/embed/1"),
            Err(ExtractorError::UnsupportedExtractor)
        ));
        assert_eq!(factory.supported_hosts(), vec!["UpCloud", "MixDrop"]);
    }
}
