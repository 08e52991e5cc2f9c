use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Container/delivery format of a stream URL.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Hls,
    Dash,
    Mp4,
    Mkv,
    Unknown,
}

impl StreamFormat {
    pub fn as_str(&self) -> &str {
        match self {
            StreamFormat::Hls => "hls",
            StreamFormat::Dash => "dash",
            StreamFormat::Mp4 => "mp4",
            StreamFormat::Mkv => "mkv",
            StreamFormat::Unknown => "unknown",
        }
    }

    pub fn from_extension(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "m3u8" => StreamFormat::Hls,
            "mpd" => StreamFormat::Dash,
            "mp4" | "m4v" => StreamFormat::Mp4,
            "mkv" => StreamFormat::Mkv,
            _ => StreamFormat::Unknown,
        }
    }

    /// Guess the format from the path extension of a URL, ignoring query and fragment.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();
        file.rsplit_once('.')
            .map(|(_, ext)| Self::from_extension(ext))
            .unwrap_or(StreamFormat::Unknown)
    }
}

impl Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StreamFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hls" | "m3u8" => Ok(StreamFormat::Hls),
            "dash" | "mpd" => Ok(StreamFormat::Dash),
            "mp4" => Ok(StreamFormat::Mp4),
            "mkv" => Ok(StreamFormat::Mkv),
            "unknown" => Ok(StreamFormat::Unknown),
            _ => Err(()),
        }
    }
}

/// Extra attributes attached to a [`Stream`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Flag {
    /// Signed URL that stops working after `expires_on`.
    Expires { expires_on: DateTime<Utc> },
    /// Headers the player must send when fetching the stream.
    RequiresHeaders { headers: BTreeMap<String, String> },
    /// Stream served by a known, well-behaved host.
    Trusted { name: String },
}

impl Flag {
    fn same_variant(&self, other: &Flag) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A playable stream URL.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stream {
    // Server or quality label, e.g. "UpCloud: Auto", "MixDrop"
    pub name: String,
    pub url: String,
    pub format: StreamFormat,
    // At most one flag per variant
    #[serde(default)]
    flags: Vec<Flag>,
}

impl Stream {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            name: name.into(),
            format: StreamFormat::from_url(&url),
            url,
            flags: Vec::new(),
        }
    }

    pub fn with_format(mut self, format: StreamFormat) -> Self {
        self.format = format;
        self
    }

    /// Attach a flag, replacing any existing flag of the same variant.
    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.retain(|f| !f.same_variant(&flag));
        self.flags.push(flag);
        self.flags.sort();
        self
    }

    pub fn with_expiry(self, expires_on: DateTime<Utc>) -> Self {
        self.with_flag(Flag::Expires { expires_on })
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        self.flags.iter().find_map(|flag| match flag {
            Flag::Expires { expires_on } => Some(*expires_on),
            _ => None,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_on().is_some_and(|expires_on| expires_on < now)
    }

    pub fn required_headers(&self) -> Option<&BTreeMap<String, String>> {
        self.flags.iter().find_map(|flag| match flag {
            Flag::RequiresHeaders { headers } => Some(headers),
            _ => None,
        })
    }
}

impl Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.name, self.format, self.url)
    }
}

/// A subtitle track.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subtitle {
    pub url: String,
    pub language: String,
}

impl Subtitle {
    pub fn new(url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            language: language.into(),
        }
    }
}

/// Anything an extractor can discover.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaLink {
    Stream(Stream),
    Subtitle(Subtitle),
}

impl From<Stream> for MediaLink {
    fn from(stream: Stream) -> Self {
        MediaLink::Stream(stream)
    }
}

impl From<Subtitle> for MediaLink {
    fn from(subtitle: Subtitle) -> Self {
        MediaLink::Subtitle(subtitle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn format_is_guessed_from_url() {
        assert_eq!(
            StreamFormat::from_url("https://cdn.example/hls/master.m3u8?token=abc"),
            StreamFormat::Hls
        );
        assert_eq!(
            StreamFormat::from_url("https://a-delivery.example/v/abc.mp4#t=10"),
            StreamFormat::Mp4
        );
        assert_eq!(
            StreamFormat::from_url("https://cdn.example/play"),
            StreamFormat::Unknown
        );
    }

    #[test]
    fn same_variant_flag_is_replaced() {
        let first = Utc::now();
        let second = first + Duration::hours(1);
        let stream = Stream::new("UpCloud: Auto", "https://cdn.example/master.m3u8")
            .with_expiry(first)
            .with_flag(Flag::Trusted {
                name: "UpCloud".to_string(),
            })
            .with_expiry(second);

        assert_eq!(stream.flags().len(), 2);
        assert_eq!(stream.expires_on(), Some(second));
    }

    #[test]
    fn flag_order_does_not_affect_equality() {
        let expires_on = Utc::now();
        let trusted = Flag::Trusted {
            name: "MixDrop".to_string(),
        };
        let a = Stream::new("MixDrop", "https://cdn.example/v.mp4")
            .with_expiry(expires_on)
            .with_flag(trusted.clone());
        let b = Stream::new("MixDrop", "https://cdn.example/v.mp4")
            .with_flag(trusted)
            .with_expiry(expires_on);

        assert_eq!(a, b);
    }

    #[test]
    fn expiry_is_strictly_in_the_past() {
        let now = Utc::now();
        let stream = Stream::new("s", "https://cdn.example/v.mp4");
        assert!(!stream.is_expired(now));
        assert!(stream.clone().with_expiry(now - Duration::seconds(1)).is_expired(now));
        assert!(!stream.with_expiry(now).is_expired(now));
    }
}
