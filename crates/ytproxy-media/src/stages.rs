//! Argument templates for the extraction and transcode stages.
//!
//! The extraction stage asks yt-dlp to write the media stream to stdout;
//! for mp3 downloads a transcode stage re-encodes that stream at a fixed
//! 128 kbps / 44.1 kHz. The source URL is always the canonical one rebuilt
//! from a validated id, passed as a single argv token.

use ytproxy_models::{MediaFormat, VideoRef};

use crate::command::{StageSpec, Tool};

/// Fixed mp3 encoding policy.
const AUDIO_BITRATE: &str = "128k";
const AUDIO_SAMPLE_RATE: &str = "44100";

/// yt-dlp stage emitting the requested source stream on stdout.
///
/// VIDEO pulls a directly playable mp4 container; AUDIO pulls the best
/// audio-only stream for the transcoder to consume.
pub fn extraction_stage(video: &VideoRef, format: MediaFormat) -> StageSpec {
    let selector = match format {
        MediaFormat::Mp4 => "best[ext=mp4]/best",
        MediaFormat::Mp3 => "bestaudio/best",
    };

    StageSpec::new(Tool::Extractor)
        .args(["--quiet", "--no-warnings", "--no-progress", "--no-playlist"])
        .args(["-f", selector])
        .args(["-o", "-"])
        .arg(&video.canonical_url)
}

/// ffmpeg stage re-encoding stdin to mp3 on stdout.
pub fn transcode_stage() -> StageSpec {
    StageSpec::new(Tool::Transcoder)
        .args(["-hide_banner", "-loglevel", "error"])
        .args(["-i", "pipe:0"])
        .arg("-vn")
        .args(["-acodec", "libmp3lame"])
        .args(["-b:a", AUDIO_BITRATE])
        .args(["-ar", AUDIO_SAMPLE_RATE])
        .args(["-f", "mp3"])
        .arg("pipe:1")
}

/// Stage list for one download: extraction, plus transcode for mp3.
pub fn download_stages(video: &VideoRef, format: MediaFormat) -> Vec<StageSpec> {
    let mut stages = vec![extraction_stage(video, format)];
    if format.needs_transcode() {
        stages.push(transcode_stage());
    }
    stages
}
