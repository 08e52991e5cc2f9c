use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use link_cache::{Flag, Stream, Subtitle};
use regex::Regex;
use reqwest::Client;
use reqwest::header::{HeaderMap, REFERER};
use tracing::debug;
use url::Url;

use crate::error::ExtractorError;
use crate::extractor::{EmbedExtractor, HostClient, LinkSink};
use crate::utils::{JsUnpacker, SubstringExtractor};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?mixdrop\.(?:co|to|ag|bz|ch|club|ps|si|sx)/(?:f|e)/(\w+)")
        .unwrap()
});

static SCRIPT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<script[^>]*>([\s\S]*?)</script>").unwrap());

const NOT_FOUND_MARKER: &str = "can't find the video you're looking for";
const VIDEO_MARKER: &str = "Core.wurl=\"";
const SUBTITLE_MARKER: &str = "Core.remotesub=\"";
const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Video URL and optional subtitle URL pulled from an unpacked player script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlayerSources {
    pub video: String,
    pub subtitle: Option<String>,
}

pub struct MixDrop {
    client: HostClient,
}

impl MixDrop {
    pub const NAME: &str = "MixDrop";

    const HOST: &str = "mixdrop.co";

    const REFERER_URL: &str = "https://mixdrop.co/";

    pub fn new(client: Client) -> Self {
        let mut client = HostClient::new(Self::NAME, client);
        client.add_header(REFERER, Self::REFERER_URL);
        Self { client }
    }

    /// File pages (`/f/`) embed the player page (`/e/`).
    fn embed_url(url: &Url) -> String {
        url.as_str().replacen("/f/", "/e/", 1)
    }

    async fn get_embed_page(&self, url: &str, headers: &HeaderMap) -> Result<String, ExtractorError> {
        let response = self.client.get_with(url, headers).send().await?;
        if let Some(e) = ExtractorError::from_status(response.status()) {
            return Err(e);
        }
        Ok(response.text().await?)
    }

    pub(crate) fn find_packed_script(body: &str) -> Option<&str> {
        SCRIPT_REGEX
            .captures_iter(body)
            .filter_map(|captures| captures.get(1))
            .map(|script| script.as_str())
            .find(|script| JsUnpacker::is_packed(script))
    }

    /// Extracts the player sources from an embed page.
    pub(crate) fn parse_embed_page(body: &str) -> Result<Option<PlayerSources>, ExtractorError> {
        if body.contains(NOT_FOUND_MARKER) {
            return Ok(None);
        }

        let script = Self::find_packed_script(body)
            .ok_or_else(|| ExtractorError::Unpack("no packed player script".to_string()))?;
        let unpacked = JsUnpacker::unpack(script)?;

        let mut extractor = SubstringExtractor::new(&unpacked);
        let subtitle = extractor
            .substring_between(SUBTITLE_MARKER, "\"")
            .filter(|subtitle| !subtitle.is_empty())
            .map(|subtitle| {
                urlencoding::decode(subtitle)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| subtitle.to_string())
            });
        let video = extractor
            .substring_between(VIDEO_MARKER, "\"")
            .filter(|video| !video.is_empty())
            .ok_or_else(|| ExtractorError::Unpack("video url not found in player script".to_string()))?;

        let video = if video.starts_with("//") {
            format!("https:{video}")
        } else {
            video.to_string()
        };

        Ok(Some(PlayerSources { video, subtitle }))
    }

    fn stream(video: String) -> Stream {
        let headers = BTreeMap::from([(REFERER.to_string(), Self::REFERER_URL.to_string())]);
        Stream::new(Self::NAME, video).with_flag(Flag::RequiresHeaders { headers })
    }
}

#[async_trait]
impl EmbedExtractor for MixDrop {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn host(&self) -> &str {
        Self::HOST
    }

    async fn extract_embed(
        &self,
        url: &Url,
        headers: &HeaderMap,
        sink: &LinkSink,
    ) -> Result<(), ExtractorError> {
        if !URL_REGEX.is_match(url.as_str()) {
            return Err(ExtractorError::InvalidUrl(url.to_string()));
        }

        let embed_url = Self::embed_url(url);
        debug!(url = %embed_url, "fetching embed page");
        let body = match self.get_embed_page(&embed_url, headers).await {
            Ok(body) => body,
            Err(ExtractorError::SourceNotFound) => return Ok(()),
            Err(e) => return Err(e),
        };

        let Some(sources) = Self::parse_embed_page(&body)? else {
            debug!(url = %embed_url, "video not found");
            return Ok(());
        };

        if !sink.stream(Self::stream(sources.video)).await {
            return Ok(());
        }
        if let Some(subtitle) = sources.subtitle {
            sink.subtitle(Subtitle::new(subtitle, UNKNOWN_LANGUAGE)).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use link_cache::{CacheKey, CachedLinks, CachedLinksRepository, MediaLink, StreamFormat};

    use super::*;
    use crate::default::default_client;
    use crate::error::ErrorKind;
    use crate::extractor::testing::{client_resolving, serve};
    use crate::extractor::{AnyExtractor, link_channel};
    use crate::loader::{LinkLoader, LinkRequest, LoadStatus, LoaderConfig};
    use crate::provider::registry::ProviderRegistry;

    const PACKED_PAGE: &str = r#"<html><head><script src="/player.js"></script></head><body>
<div id="videojs"></div>
<script>var MDCore = {};</script>
<script>
MDCore.ref = "abc123";
eval(function(p,a,c,k,e,d){e=function(c){return c.toString(36)};if(!''.replace(/^/,String)){while(c--){d[c.toString(a)]=k[c]||c.toString(a)}k=[function(e){return d[e]}];e=function(){return'\\w+'};c=1};while(c--){if(k[c]){p=p.replace(new RegExp('\\b'+e(c)+'\\b','g'),k[c])}}return p}('0.1="2";0.3="4%5%6%7.8.9%a%b.c";0.d="//e-f.8.9/g/2.h";',62,18,'MDCore|ref|abc123|remotesub|https|3A|2F|2Fs|mxcontent|net|2Fsub|2Fen|vtt|wurl|a|delivery12|v|mp4'.split('|'),0,{}))
</script></body></html>"#;

    #[test]
    fn url_regex_matches_mirrors() {
        for url in [
            "https://mixdrop.co/e/abc123",
            "https://mixdrop.to/f/abc123",
            "https://www.mixdrop.sx/e/abc123?autoplay=1",
        ] {
            assert!(URL_REGEX.is_match(url), "{url}");
        }
        assert!(!URL_REGEX.is_match("https://mixdrop.co/x/abc123"));

        let url = Url::parse("https://mixdrop.to/f/abc123").unwrap();
        assert_eq!(MixDrop::embed_url(&url), "https://mixdrop.to/e/abc123");
    }

    #[test]
    fn packed_page_yields_video_and_subtitle() {
        let sources = MixDrop::parse_embed_page(PACKED_PAGE).unwrap().unwrap();
        assert_eq!(
            sources.video,
            "https://a-delivery12.mxcontent.net/v/abc123.mp4"
        );
        assert_eq!(
            sources.subtitle.as_deref(),
            Some("https://s.mxcontent.net/sub/en.vtt")
        );
    }

    #[test]
    fn not_found_page_is_empty() {
        let body = "<h2>We can't find the video you're looking for.</h2>";
        assert_eq!(MixDrop::parse_embed_page(body).unwrap(), None);
    }

    #[test]
    fn page_without_packed_script_is_an_error() {
        let body = "<script>var x = 1;</script>";
        assert!(matches!(
            MixDrop::parse_embed_page(body),
            Err(ExtractorError::Unpack(_))
        ));
    }

    #[test]
    fn stream_carries_referer() {
        let stream = MixDrop::stream("https://a-delivery12.mxcontent.net/v/abc123.mp4".to_string());
        assert_eq!(stream.format, StreamFormat::Mp4);
        assert_eq!(
            stream.required_headers().unwrap()["referer"],
            "https://mixdrop.co/"
        );
        let link = MediaLink::from(stream);
        assert!(matches!(link, MediaLink::Stream(_)));
    }

    // Symbol table has three entries where five are declared.
    const CORRUPT_PAGE: &str = r#"<html><body><script>
eval(function(p,a,c,k,e,d){while(c--){if(k[c]){p=p.replace(new RegExp('\\b'+c.toString(a)+'\\b','g'),k[c])}}return p}('0.1="//2.3/v.mp4";',62,5,'MDCore|wurl|cdn'.split('|'),0,{}))
</script></body></html>"#;

    async fn run_against(page: &'static str, key: &CacheKey, loader: &LinkLoader) -> LoadStatus {
        let addr = serve(vec![("/e/abc123", page.as_bytes().to_vec())]).await;
        let extractor = AnyExtractor::Embed(Arc::new(MixDrop::new(client_resolving(
            "mixdrop.co",
            addr,
        ))));
        loader
            .load_extractor(
                LinkRequest::new(key.clone()),
                &extractor,
                &Url::parse("http://mixdrop.co/f/abc123").unwrap(),
                &HeaderMap::new(),
            )
            .await
    }

    fn loader() -> LinkLoader {
        LinkLoader::new(
            Arc::new(CachedLinksRepository::default()),
            Arc::new(ProviderRegistry::new()),
            LoaderConfig::default(),
        )
    }

    #[tokio::test]
    async fn embed_page_links_reach_the_cache() {
        let loader = loader();
        let key = CacheKey::movie("mixdrop", "abc123");

        let status = run_against(PACKED_PAGE, &key, &loader).await;
        assert_eq!(
            status,
            LoadStatus::Success {
                streams: 1,
                subtitles: 1
            }
        );
        let links = loader.repository().get_cache(&key).unwrap();
        assert!(
            links
                .streams
                .iter()
                .any(|stream| stream.url == "https://a-delivery12.mxcontent.net/v/abc123.mp4")
        );
    }

    #[tokio::test]
    async fn corrupt_packed_script_leaves_cached_entry_untouched() {
        assert!(matches!(
            MixDrop::parse_embed_page(CORRUPT_PAGE),
            Err(ExtractorError::Unpack(_))
        ));

        let loader = loader();
        let key = CacheKey::movie("mixdrop", "abc123");
        let mut before = CachedLinks::for_key(&key);
        before.append_stream(MixDrop::stream("https://cdn.example/cached.mp4".to_string()));
        before.append_subtitle(Subtitle::new("https://cc.example/en.vtt", "English"));
        loader.repository().store_cache(&key, before.clone());

        let status = run_against(CORRUPT_PAGE, &key, &loader).await;
        assert!(matches!(
            status,
            LoadStatus::Failed {
                kind: ErrorKind::Decryption,
                ..
            }
        ));
        assert_eq!(loader.repository().get_cache(&key), Some(before));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_integration() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let extractor = MixDrop::new(default_client().unwrap());
        let url = Url::parse("https://mixdrop.co/e/3nzwk7ndfl4k9v").unwrap();
        let (sink, mut rx) = link_channel(4);
        let task = tokio::spawn(async move {
            extractor
                .extract_embed(&url, &HeaderMap::new(), &sink)
                .await
        });
        while let Some(link) = rx.recv().await {
            debug!(?link, "link");
        }
        task.await.unwrap().unwrap();
    }
}
