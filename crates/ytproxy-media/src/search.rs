//! Search adapter: free-text query → normalized [`VideoRecord`]s.
//!
//! Delegates to yt-dlp's `ytsearchN:` pseudo-URL with `--flat-playlist
//! --dump-json`, which emits one JSON object per result line without
//! resolving media streams. Result order is whatever the backend returns.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use ytproxy_models::{VideoId, VideoRecord};

use crate::command::Tool;
use crate::error::{MediaError, MediaResult};

/// One line of `--flat-playlist --dump-json` output. Only the fields we
/// normalize; everything else is ignored.
#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<FlatThumbnail>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlatThumbnail {
    url: Option<String>,
}

/// Run a search against the external backend.
///
/// `limit` bounds what is requested from the backend (`ytsearch{limit}:`),
/// not a post-hoc truncation. An empty query is rejected before any process
/// is spawned.
pub async fn search(query: &str, limit: usize, timeout: Duration) -> MediaResult<Vec<VideoRecord>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(MediaError::EmptyQuery);
    }
    let limit = limit.max(1);

    Tool::Extractor.check()?;

    let search_arg = format!("ytsearch{limit}:{query}");
    debug!(%search_arg, "running search");

    let mut cmd = Command::new(Tool::Extractor.binary());
    cmd.args(["--flat-playlist", "--dump-json", "--no-warnings", "--quiet"])
        .arg(&search_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| MediaError::Timeout(timeout.as_secs()))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            code = ?output.status.code(),
            stderr = %stderr.lines().last().unwrap_or_default(),
            "search backend failed"
        );
        return Err(MediaError::StageFailed {
            tool: Tool::Extractor.binary(),
            exit_code: output.status.code(),
            stderr: stderr.into_owned(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let records = parse_flat_results(&stdout)?;
    if records.is_empty() {
        return Err(MediaError::NoResults);
    }

    info!(query, count = records.len(), "search completed");
    Ok(records)
}

/// Parse newline-delimited flat-playlist JSON, preserving backend order.
///
/// Entries without a valid video id (playlists, deleted videos) are
/// skipped. Author and duration stay absent when the backend omits them.
fn parse_flat_results(stdout: &str) -> MediaResult<Vec<VideoRecord>> {
    let mut records = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: FlatEntry = serde_json::from_str(line)?;

        let Some(id) = entry.id.as_deref().and_then(|id| VideoId::parse(id).ok()) else {
            debug!(id = ?entry.id, "skipping entry without a valid video id");
            continue;
        };

        let thumbnail = entry
            .thumbnail
            .or_else(|| entry.thumbnails.into_iter().rev().find_map(|t| t.url))
            .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg"));

        let title = entry
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| id.to_string());

        records.push(VideoRecord {
            url: id.watch_url(),
            id,
            title,
            thumbnail,
            duration_seconds: entry.duration.map(|d| d.round() as u64),
            author: entry.uploader.or(entry.channel),
        });
    }

    Ok(records)
}
