//! Shared data models for the ytproxy backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video identifiers and references (with URL → id extraction)
//! - Search result records
//! - Target media formats (mp4 / mp3)
//! - Attachment filename sanitization

pub mod filename;
pub mod format;
pub mod video;

pub use filename::attachment_filename;
pub use format::{FormatParseError, MediaFormat};
pub use video::{extract_video_id, VideoId, VideoIdError, VideoRecord, VideoRef};
