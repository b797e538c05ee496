use std::sync::LazyLock;

use regex::Regex;

use super::{
    playlist::{
        Key, KeyMethod, MasterPlaylist, MediaPlaylist, MediaSegment, Playlist, VariantStream,
    },
    utils::resolve_uri,
};
use crate::error::{VodlError, VodlResult};

// NAME=VALUE where VALUE is either quoted (and may contain commas) or runs to the next comma
static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z0-9\-]+)=("[^"]*"|[^,]*)"#).expect("valid attribute regex")
});

/// Attribute list of a tag such as `#EXT-X-STREAM-INF` or `#EXT-X-KEY`.
#[derive(Debug, Default, PartialEq)]
pub struct AttributeList(Vec<(String, String)>);

impl AttributeList {
    pub fn parse(input: &str) -> Self {
        let attributes = ATTRIBUTE_REGEX
            .captures_iter(input)
            .map(|captures| {
                let name = captures[1].to_ascii_uppercase();
                let value = captures[2].trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                (name, value.to_string())
            })
            .collect();
        Self(attributes)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

enum Pending {
    Variant {
        line: usize,
        content: String,
        attributes: AttributeList,
    },
    Segment {
        line: usize,
        content: String,
        duration: Option<f64>,
        title: Option<String>,
    },
}

impl Pending {
    fn into_error(self) -> VodlError {
        let (line, content) = match self {
            Pending::Variant { line, content, .. } => (line, content),
            Pending::Segment { line, content, .. } => (line, content),
        };
        VodlError::parse(line, &content, "tag is not followed by a URI")
    }
}

#[derive(Default)]
struct ParserState {
    variants: Vec<VariantStream>,
    media: MediaPlaylist,
    key: Option<Key>,
    /// Sequence of the next segment, `None` once it has run past `u64::MAX`.
    sequence: Option<u64>,
    pending: Option<Pending>,
}

/// Parse m3u8 text into a master or media playlist.
///
/// Line numbers in errors start from 1.
pub fn parse_playlist(text: &str, base_uri: &str) -> VodlResult<Playlist> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_start_matches('\u{feff}').trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        Some((_, "#EXTM3U")) => {}
        Some((line, content)) => {
            return Err(VodlError::parse(line, content, "missing #EXTM3U header"))
        }
        None => return Err(VodlError::parse(1, "", "empty playlist")),
    }

    let mut state = ParserState {
        sequence: Some(0),
        ..Default::default()
    };
    for (line, content) in lines {
        if !content.starts_with('#') {
            state.push_uri(line, content, base_uri)?;
            continue;
        }

        // comments
        if !content.starts_with("#EXT") {
            continue;
        }

        let (tag, payload) = content.split_once(':').unwrap_or((content, ""));
        match tag {
            "#EXT-X-STREAM-INF" => {
                state.set_pending(Pending::Variant {
                    line,
                    content: content.to_string(),
                    attributes: AttributeList::parse(payload),
                })?;
            }
            "#EXTINF" => {
                let (duration, title) = payload.split_once(',').unwrap_or((payload, ""));
                let duration = match duration.trim() {
                    "" => None,
                    duration => Some(duration.parse::<f64>().map_err(|_| {
                        VodlError::parse(line, content, "invalid segment duration")
                    })?),
                };
                let title = Some(title.trim())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);
                state.set_pending(Pending::Segment {
                    line,
                    content: content.to_string(),
                    duration,
                    title,
                })?;
            }
            "#EXT-X-KEY" => {
                let attributes = AttributeList::parse(payload);
                let method = attributes
                    .get("METHOD")
                    .ok_or_else(|| VodlError::parse(line, content, "key without METHOD"))?;
                state.key = Some(Key {
                    method: KeyMethod::from(method),
                    uri: attributes.get("URI").map(|uri| resolve_uri(base_uri, uri)),
                });
            }
            "#EXT-X-TARGETDURATION" => {
                state.media.target_duration = Some(parse_integer(line, content, payload)?);
            }
            "#EXT-X-MEDIA-SEQUENCE" => {
                let sequence = parse_integer(line, content, payload)?;
                if state.media.segments.is_empty() {
                    state.media.media_sequence = sequence;
                }
                state.sequence = Some(sequence);
            }
            "#EXT-X-VERSION" => {
                state.media.version = Some(parse_integer(line, content, payload)?);
            }
            "#EXT-X-ENDLIST" => {
                state.media.end_list = true;
                break;
            }
            "#EXT-X-PROGRAM-DATE-TIME"
            | "#EXT-X-ALLOW-CACHE"
            | "#EXT-X-PLAYLIST-TYPE"
            | "#EXT-X-DISCONTINUITY"
            | "#EXT-X-BYTERANGE"
            | "#EXT-X-I-FRAME-STREAM-INF"
            | "#EXT-X-I-FRAMES-ONLY" => {
                tracing::trace!("Skipping tag {tag} at line {line}");
            }
            _ => {
                tracing::debug!("Ignoring unknown tag {tag} at line {line}");
            }
        }
    }

    if let Some(pending) = state.pending.take() {
        return Err(pending.into_error());
    }

    if state.variants.is_empty() {
        Ok(Playlist::Media(state.media))
    } else {
        Ok(Playlist::Master(MasterPlaylist {
            variants: state.variants,
        }))
    }
}

impl ParserState {
    fn set_pending(&mut self, pending: Pending) -> VodlResult<()> {
        if let Some(previous) = self.pending.replace(pending) {
            return Err(previous.into_error());
        }
        Ok(())
    }

    fn push_uri(&mut self, line: usize, uri: &str, base_uri: &str) -> VodlResult<()> {
        match self.pending.take() {
            Some(Pending::Variant {
                line: tag_line,
                content,
                attributes,
            }) => {
                let bandwidth = attributes
                    .get("BANDWIDTH")
                    .ok_or_else(|| {
                        VodlError::parse(tag_line, &content, "variant without BANDWIDTH")
                    })?
                    .parse()
                    .map_err(|_| VodlError::parse(tag_line, &content, "invalid BANDWIDTH"))?;
                let average_bandwidth = attributes
                    .get("AVERAGE-BANDWIDTH")
                    .and_then(|value| value.parse().ok());
                let resolution = attributes
                    .get("RESOLUTION")
                    .and_then(|value| value.parse().ok());

                self.variants.push(VariantStream {
                    bandwidth,
                    average_bandwidth,
                    resolution,
                    codecs: attributes.get("CODECS").map(str::to_string),
                    uri: resolve_uri(base_uri, uri),
                });
            }
            Some(Pending::Segment {
                duration, title, ..
            }) => {
                let media_sequence = self
                    .sequence
                    .ok_or_else(|| VodlError::parse(line, uri, "media sequence overflow"))?;
                self.media.segments.push(MediaSegment {
                    media_sequence,
                    duration,
                    title,
                    key: self.key.clone(),
                    uri: resolve_uri(base_uri, uri),
                });
                self.sequence = media_sequence.checked_add(1);
            }
            None => {
                tracing::debug!("Ignoring URI without #EXTINF at line {line}: {uri}");
            }
        }
        Ok(())
    }
}

fn parse_integer(line: usize, content: &str, payload: &str) -> VodlResult<u64> {
    payload
        .trim()
        .parse()
        .map_err(|_| VodlError::parse(line, content, "invalid integer"))
}
