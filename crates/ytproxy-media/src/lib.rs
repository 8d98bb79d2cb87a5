//! Subprocess layer for the ytproxy backend.
//!
//! This crate provides:
//! - An allow-listed process runner for yt-dlp and ffmpeg
//! - A supervised stream pipeline (extraction → optional transcode)
//! - Argument templates for the two download formats
//! - A search adapter over yt-dlp's flat-playlist JSON output

pub mod command;
pub mod error;
pub mod pipeline;
pub mod search;
pub mod stages;

pub use command::{StageSpec, Tool};
pub use error::{MediaError, MediaResult};
pub use pipeline::{ByteStream, Pipeline, PipelineOutcome};
pub use search::search;
pub use stages::{download_stages, extraction_stage, transcode_stage};
