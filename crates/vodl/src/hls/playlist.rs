use std::{fmt, str::FromStr};

use crate::error::VodlResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

impl Playlist {
    /// Parse m3u8 text, resolving relative URIs against `base_uri`.
    pub fn parse(text: &str, base_uri: &str) -> VodlResult<Self> {
        super::parser::parse_playlist(text, base_uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

impl FromStr for Resolution {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s.split_once(['x', 'X']).ok_or(())?;
        Ok(Self {
            width: width.trim().parse().map_err(|_| ())?,
            height: height.trim().parse().map_err(|_| ())?,
        })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One rendition listed by `#EXT-X-STREAM-INF`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantStream {
    /// Peak bits per second
    pub bandwidth: u64,
    pub average_bandwidth: Option<u64>,
    pub resolution: Option<Resolution>,
    pub codecs: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMethod {
    None,
    Aes128,
    SampleAes,
    Other(String),
}

impl From<&str> for KeyMethod {
    fn from(method: &str) -> Self {
        match method {
            "NONE" => Self::None,
            "AES-128" => Self::Aes128,
            "SAMPLE-AES" => Self::SampleAes,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for KeyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("NONE"),
            Self::Aes128 => f.write_str("AES-128"),
            Self::SampleAes => f.write_str("SAMPLE-AES"),
            Self::Other(method) => f.write_str(method),
        }
    }
}

/// Key descriptor from `#EXT-X-KEY`. The key bytes are fetched by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub method: KeyMethod,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    /// Media sequence number, also the input of IV derivation
    pub media_sequence: u64,
    pub duration: Option<f64>,
    pub title: Option<String>,
    /// Key in effect for this segment
    pub key: Option<Key>,
    pub uri: String,
}

impl MediaSegment {
    /// Whether the segment body has to go through the decryption unit.
    pub fn is_encrypted(&self) -> bool {
        self.key
            .as_ref()
            .is_some_and(|key| key.method != KeyMethod::None)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaPlaylist {
    pub target_duration: Option<u64>,
    pub version: Option<u64>,
    /// Value of `#EXT-X-MEDIA-SEQUENCE`, 0 when absent
    pub media_sequence: u64,
    pub end_list: bool,
    pub segments: Vec<MediaSegment>,
}

impl MediaPlaylist {
    /// Sum of all declared segment durations in seconds.
    pub fn duration(&self) -> f64 {
        self.segments
            .iter()
            .filter_map(|segment| segment.duration)
            .sum()
    }
}
