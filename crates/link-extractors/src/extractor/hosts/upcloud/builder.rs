use std::sync::LazyLock;

use async_trait::async_trait;
use bytes::Bytes;
use link_cache::{Stream, StreamFormat, Subtitle};
use regex::Regex;
use reqwest::Client;
use reqwest::header::{HeaderName, REFERER};
use tracing::debug;
use url::Url;

use crate::error::ExtractorError;
use crate::extractor::hosts::upcloud::crypto::decrypt_salted;
use crate::extractor::hosts::upcloud::models::{EncodedSources, Source, SourcesResponse, Track};
use crate::extractor::hosts::upcloud::steganography::extract_key;
use crate::extractor::{Extractor, HostClient, LinkSink};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.)?((?:rabbitstream|dokicloud|megacloud)\.[a-z]+)/((?:v\d+/)?embed-\d+(?:/v\d+)?(?:/e-\d+)?)/([\w-]+)",
    )
    .unwrap()
});

static X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

const DEFAULT_KEY_IMAGE_PATH: &str = "/images/image.png";
const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Extractor for the rabbitstream family of embed hosts.
///
/// The sources endpoint answers with a `Salted__` AES payload whose passphrase
/// is hidden in a PNG served by the same host.
pub struct UpCloud {
    client: HostClient,
    key_image_path: String,
}

impl UpCloud {
    pub const NAME: &str = "UpCloud";

    const HOST: &str = "rabbitstream.net";

    pub fn new(client: Client) -> Self {
        let mut client = HostClient::new(Self::NAME, client);
        client.add_header(X_REQUESTED_WITH.clone(), "XMLHttpRequest");
        Self {
            client,
            key_image_path: DEFAULT_KEY_IMAGE_PATH.to_string(),
        }
    }

    /// Overrides where the key image lives on the embed host.
    pub fn with_key_image_path(mut self, path: impl Into<String>) -> Self {
        self.key_image_path = path.into();
        self
    }

    /// `origin` is the scheme and host of the embed page.
    fn sources_url(origin: &str, embed_path: &str, media_id: &str) -> String {
        format!("{origin}/ajax/{embed_path}/getSources?id={media_id}")
    }

    /// Fetches the sources document. `None` when the host reports no source.
    async fn get_sources(
        &self,
        url: &Url,
        origin: &str,
        embed_path: &str,
        media_id: &str,
    ) -> Result<Option<SourcesResponse>, ExtractorError> {
        let response = self
            .client
            .get(&Self::sources_url(origin, embed_path, media_id))
            .header(REFERER, url.as_str())
            .send()
            .await?;

        match ExtractorError::from_status(response.status()) {
            None => {}
            Some(ExtractorError::SourceNotFound) => return Ok(None),
            Some(e) => return Err(e),
        }

        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn get_key_image(&self, origin: &str) -> Result<Bytes, ExtractorError> {
        let url = format!("{origin}{}", self.key_image_path);
        debug!(url = %url, "fetching key image");
        let response = self.client.get(&url).send().await?;
        if let Some(e) = ExtractorError::from_status(response.status()) {
            return Err(e);
        }
        Ok(response.bytes().await?)
    }

    async fn resolve_sources(
        &self,
        origin: &str,
        sources: EncodedSources,
        encrypted: bool,
    ) -> Result<Vec<Source>, ExtractorError> {
        match sources {
            EncodedSources::Plain(sources) => Ok(sources),
            EncodedSources::Encrypted(payload) if encrypted => {
                let png = self.get_key_image(origin).await?;
                tokio::task::spawn_blocking(move || decrypt_sources(&png, &payload))
                    .await
                    .map_err(|e| ExtractorError::Other(format!("decryption task failed: {e}")))?
            }
            EncodedSources::Encrypted(_) => Err(ExtractorError::Decryption(
                "sources are a string but not flagged as encrypted".to_string(),
            )),
        }
    }

    async fn publish(&self, sources: Vec<Source>, tracks: Vec<Track>, sink: &LinkSink) {
        for source in sources {
            let format = source
                .kind
                .as_deref()
                .and_then(|kind| kind.parse::<StreamFormat>().ok())
                .unwrap_or_else(|| StreamFormat::from_url(&source.url));
            let stream = Stream::new(format!("{}: Auto", Self::NAME), source.url).with_format(format);
            if !sink.stream(stream).await {
                return;
            }
        }

        for track in tracks.into_iter().filter(Track::is_subtitle) {
            let language = track
                .label
                .filter(|label| !label.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());
            if !sink.subtitle(Subtitle::new(track.url, language)).await {
                return;
            }
        }
    }
}

/// Recovers the key from `png` and decrypts `payload` into source entries.
pub fn decrypt_sources(png: &[u8], payload: &str) -> Result<Vec<Source>, ExtractorError> {
    let passphrase = extract_key(png)?;
    let plain = decrypt_salted(payload, &passphrase)?;
    Ok(serde_json::from_slice(&plain)?)
}

#[async_trait]
impl Extractor for UpCloud {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn host(&self) -> &str {
        Self::HOST
    }

    async fn extract(
        &self,
        url: &Url,
        media_id: &str,
        _episode_id: Option<&str>,
        sink: &LinkSink,
    ) -> Result<(), ExtractorError> {
        let captures = URL_REGEX
            .captures(url.as_str())
            .ok_or_else(|| ExtractorError::InvalidUrl(url.to_string()))?;
        let origin = format!("{}://{}", url.scheme(), &captures[1]);
        let embed_path = &captures[2];

        debug!(origin = %origin, media_id = %media_id, "fetching sources");
        let Some(response) = self.get_sources(url, &origin, embed_path, media_id).await? else {
            debug!(media_id = %media_id, "host reported no sources");
            return Ok(());
        };

        let sources = self
            .resolve_sources(&origin, response.sources, response.encrypted)
            .await?;
        debug!(
            media_id = %media_id,
            sources = sources.len(),
            tracks = response.tracks.len(),
            "resolved sources"
        );
        self.publish(sources, response.tracks, sink).await;
        Ok(())
    }
}
