use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::hls::KeyMethod;

#[derive(Error, Debug)]
pub enum VodlError {
    #[error("Invalid m3u8 file at line {line} ({reason}): {content}")]
    Parse {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Request to {uri} timed out after {timeout:?}")]
    NetworkTimeout { uri: String, timeout: Duration },

    #[error("Unexpected HTTP status {status} from {uri}")]
    UnexpectedStatus {
        uri: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to fetch {uri}: {source}")]
    Connection {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Segment {media_sequence} ({uri}) failed after {attempts} attempt(s): {source}")]
    SegmentDownload {
        media_sequence: u64,
        uri: String,
        attempts: u32,
        #[source]
        source: Box<VodlError>,
    },

    #[error("Media sequence {0} appears more than once in the playlist")]
    DuplicateSequence(u64),

    #[error("No space left on device")]
    NoSpaceLeft(#[source] std::io::Error),

    #[error("Download cancelled by user")]
    CancelledByUser,

    #[error("Staged file of segment {media_sequence} is missing: {}", .path.display())]
    StitchError { media_sequence: u64, path: PathBuf },

    #[error("Unsupported key method: {0}")]
    UnsupportedKeyMethod(KeyMethod),

    #[error("Key from {uri} has {len} bytes, expected 16")]
    InvalidKeyLength { uri: String, len: usize },

    #[error("Key of segment {media_sequence} has no URI")]
    MissingKeyUri { media_sequence: u64 },

    #[error("Failed to decrypt segment {media_sequence}: {len} bytes is not block aligned")]
    Decrypt { media_sequence: u64, len: usize },

    #[error("Media sequence {0} does not fit in a 32-bit IV word")]
    SequenceOutOfRange(u64),

    #[error("No variant with bandwidth {0}")]
    NoSuchBitrate(u64),

    #[error("Master playlist has no variants")]
    NoVariants,

    #[error("Invalid bitrate criterion: {0}")]
    InvalidCriterion(String),

    #[error("Expected a master playlist at {0}")]
    NotMasterPlaylist(String),

    #[error("Expected a media playlist at {0}")]
    NotMediaPlaylist(String),

    #[error("Output file already exists: {}", .0.display())]
    FileExists(PathBuf),

    #[error("Output file is being downloaded by another process: {}", .0.display())]
    OutputLocked(PathBuf),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error(transparent)]
    IOError(std::io::Error),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    TomlError(#[from] toml::de::Error),
}

impl From<std::io::Error> for VodlError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::StorageFull {
            Self::NoSpaceLeft(error)
        } else {
            Self::IOError(error)
        }
    }
}

impl VodlError {
    /// Network failures which are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkTimeout { .. } | Self::UnexpectedStatus { .. } | Self::Connection { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::CancelledByUser)
    }

    pub(crate) fn parse(line: usize, content: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            content: content.to_string(),
            reason: reason.into(),
        }
    }
}

pub type VodlResult<T> = Result<T, VodlError>;
