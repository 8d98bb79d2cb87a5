//! Download handler.

use axum::extract::Query;
use axum::response::Response;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::session::DownloadSession;

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    /// Bare 11-char id or any YouTube URL. `url` accepted as a deprecated
    /// alias for clients still sending full watch URLs.
    #[serde(rename = "videoId", alias = "url")]
    pub video_id: Option<String>,
    pub format: Option<String>,
    /// Optional display title carried over from a search result; only used
    /// (after sanitization) for the attachment filename.
    pub title: Option<String>,
}

/// `GET /api/download?videoId=<id>&format=<mp4|mp3>` → streamed attachment.
pub async fn download_video(Query(params): Query<DownloadParams>) -> ApiResult<Response> {
    let session = DownloadSession::validate(
        params.video_id.as_deref(),
        params.format.as_deref(),
        params.title.as_deref(),
    )?;
    session.stream().await
}
