//! Video identifiers, references, and search result records.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a YouTube video id.
const VIDEO_ID_LEN: usize = 11;

/// Errors that can occur while turning client input into a [`VideoId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VideoIdError {
    #[error("URL is not a YouTube URL")]
    NotYoutubeUrl,

    #[error("video id has invalid format")]
    InvalidVideoId,

    #[error("video id not found in URL")]
    IdNotFound,
}

/// A validated 11-character YouTube video id.
///
/// Construction always goes through [`VideoId::parse`], so a held value is
/// guaranteed to match the `[A-Za-z0-9_-]{11}` shape and is safe to splice
/// into argument vectors and URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare id string.
    pub fn parse(s: &str) -> Result<Self, VideoIdError> {
        let s = s.trim();
        if s.len() != VIDEO_ID_LEN {
            return Err(VideoIdError::InvalidVideoId);
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(VideoIdError::InvalidVideoId);
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this id.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract a video id from a YouTube URL.
///
/// Supported forms:
/// - `youtube.com/watch?v=ID` (v in any query position)
/// - `youtu.be/ID`
/// - `youtube.com/embed/ID`, `/v/ID`, `/shorts/ID`
pub fn extract_video_id(url: &str) -> Result<VideoId, VideoIdError> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    if !lower.contains("youtube.com") && !lower.contains("youtu.be") {
        return Err(VideoIdError::NotYoutubeUrl);
    }

    let markers = ["?v=", "&v=", "youtu.be/", "/embed/", "/v/", "/shorts/"];
    for marker in markers {
        if let Some(pos) = lower.find(marker) {
            let rest = &url[pos + marker.len()..];
            let end = rest
                .find(['&', '#', '?', '/'])
                .unwrap_or(rest.len());
            let candidate = &rest[..end];
            if candidate.is_empty() {
                return Err(VideoIdError::IdNotFound);
            }
            return VideoId::parse(candidate);
        }
    }

    Err(VideoIdError::IdNotFound)
}

/// A resolved reference to a source video: the validated id plus the
/// canonical watch URL derived from it.
///
/// The URL is always rebuilt from the id, never taken from the client, so a
/// `VideoRef` is safe to hand to the extraction subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub id: VideoId,
    pub canonical_url: String,
}

impl VideoRef {
    pub fn from_id(id: VideoId) -> Self {
        let canonical_url = id.watch_url();
        Self { id, canonical_url }
    }

    /// Accept either a bare id or any YouTube URL.
    pub fn from_request(input: &str) -> Result<Self, VideoIdError> {
        let id = match VideoId::parse(input) {
            Ok(id) => id,
            Err(_) => extract_video_id(input)?,
        };
        Ok(Self::from_id(id))
    }
}

/// One search result, normalized from the search backend's output.
///
/// `duration_seconds` and `author` are best-effort: absent when the backend
/// does not report them, never invented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: VideoId,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}
