use serde::Deserialize;

/// Response of the `getSources` ajax endpoint.
#[derive(Deserialize, Debug)]
pub struct SourcesResponse {
    pub sources: EncodedSources,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub encrypted: bool,
    pub server: Option<u32>,
}

/// `sources` is a base64 `Salted__` blob when `encrypted` is set, a plain
/// array otherwise.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum EncodedSources {
    Encrypted(String),
    Plain(Vec<Source>),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Source {
    #[serde(alias = "file")]
    pub url: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Track {
    #[serde(alias = "file")]
    pub url: String,
    pub label: Option<String>,
    pub kind: Option<String>,
    #[serde(default)]
    pub default: bool,
}

impl Track {
    /// Thumbnail sprites are also listed as tracks.
    pub fn is_subtitle(&self) -> bool {
        matches!(self.kind.as_deref(), Some("captions") | Some("subtitles") | None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_encrypted_response() {
        let json = r#"{
            "sources": "U2FsdGVkX1+abc",
            "tracks": [
                {"file": "https://cc.example/eng.vtt", "label": "English", "kind": "captions", "default": true},
                {"file": "https://cc.example/thumbnails.vtt", "kind": "thumbnails"}
            ],
            "encrypted": true,
            "server": 18
        }"#;
        let response: SourcesResponse = serde_json::from_str(json).unwrap();
        assert!(response.encrypted);
        assert!(matches!(response.sources, EncodedSources::Encrypted(_)));
        assert_eq!(response.server, Some(18));

        let subtitles: Vec<_> = response.tracks.iter().filter(|t| t.is_subtitle()).collect();
        assert_eq!(subtitles.len(), 1);
        assert_eq!(subtitles[0].label.as_deref(), Some("English"));
    }

    #[test]
    fn parse_plain_response() {
        let json = r#"{"sources":[{"file":"https://cdn.example/master.m3u8","type":"hls"}],"tracks":[],"encrypted":false}"#;
        let response: SourcesResponse = serde_json::from_str(json).unwrap();
        match response.sources {
            EncodedSources::Plain(sources) => {
                assert_eq!(sources[0].url, "https://cdn.example/master.m3u8");
                assert_eq!(sources[0].kind.as_deref(), Some("hls"));
            }
            EncodedSources::Encrypted(_) => panic!("expected plain sources"),
        }
    }
}
