//! Target media formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two download formats the proxy offers: the source's playable mp4
/// container, or audio extracted and re-encoded as mp3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Mp4,
    Mp3,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported format {0:?}, expected \"mp4\" or \"mp3\"")]
pub struct FormatParseError(pub String);

impl MediaFormat {
    /// File extension used in the attachment filename.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mp3 => "mp3",
        }
    }

    /// Content-Type for the streamed response.
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaFormat::Mp4 => "video/mp4",
            MediaFormat::Mp3 => "audio/mpeg",
        }
    }

    /// Whether this format needs a transcode stage after extraction.
    pub fn needs_transcode(&self) -> bool {
        matches!(self, MediaFormat::Mp3)
    }
}

impl FromStr for MediaFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" | "video" => Ok(MediaFormat::Mp4),
            "mp3" | "audio" => Ok(MediaFormat::Mp3),
            other => Err(FormatParseError(other.to_string())),
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!("mp4".parse::<MediaFormat>().unwrap(), MediaFormat::Mp4);
        assert_eq!("MP3".parse::<MediaFormat>().unwrap(), MediaFormat::Mp3);
        assert_eq!("audio".parse::<MediaFormat>().unwrap(), MediaFormat::Mp3);
        assert!("flac".parse::<MediaFormat>().is_err());
        assert!("".parse::<MediaFormat>().is_err());
    }

    #[test]
    fn mime_and_extension_match_format() {
        assert_eq!(MediaFormat::Mp4.mime_type(), "video/mp4");
        assert_eq!(MediaFormat::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(MediaFormat::Mp3.extension(), "mp3");
        assert!(MediaFormat::Mp3.needs_transcode());
        assert!(!MediaFormat::Mp4.needs_transcode());
    }
}
