//! Download session: one client request from validation to stream closure.
//!
//! State machine: Validating → Spawning → Streaming → {Completed | Failed |
//! Aborted}. Validation never spawns a process; once the first payload
//! bytes exist, framing headers go out and any later failure can only
//! truncate the stream. A per-session temp directory backs every stage and
//! is removed on all exit paths, including client aborts.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, info_span, Instrument};

use ytproxy_media::{download_stages, Pipeline, PipelineOutcome, Tool};
use ytproxy_models::{attachment_filename, MediaFormat, VideoRef};

use crate::error::{ApiError, ApiResult};

/// A validated download request, ready to spawn its pipeline.
pub struct DownloadSession {
    video: VideoRef,
    format: MediaFormat,
    filename: String,
}

impl DownloadSession {
    /// Validating: check the video reference and format shape. Invalid
    /// input fails here, before any subprocess exists.
    pub fn validate(
        video_id: Option<&str>,
        format: Option<&str>,
        title: Option<&str>,
    ) -> ApiResult<Self> {
        let raw_id = video_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request("parameter 'videoId' is required"))?;
        let video = VideoRef::from_request(raw_id)
            .map_err(|e| ApiError::bad_request(format!("invalid video reference: {e}")))?;

        let format: MediaFormat = format
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("parameter 'format' is required"))?
            .parse()
            .map_err(|e| ApiError::bad_request(format!("{e}")))?;

        let filename = attachment_filename(title, &video.id, format);

        Ok(Self {
            video,
            format,
            filename,
        })
    }

    /// Spawning + Streaming: build the stage list, start the pipeline, and
    /// return the framed streaming response once the first bytes exist.
    pub async fn stream(self) -> ApiResult<Response> {
        Tool::Extractor.check()?;
        if self.format.needs_transcode() {
            Tool::Transcoder.check()?;
        }

        // Unique per-session scratch dir; concurrent downloads of
        // same-titled videos can never collide.
        let workdir = tempfile::tempdir()
            .map_err(|e| ApiError::internal(format!("failed to create temp dir: {e}")))?;

        let stages = download_stages(&self.video, self.format);
        self.stream_stages(stages, workdir).await
    }

    /// Run the session over an explicit stage list and scratch dir.
    async fn stream_stages(
        self,
        stages: Vec<ytproxy_media::StageSpec>,
        workdir: tempfile::TempDir,
    ) -> ApiResult<Response> {
        let span = info_span!(
            "download_session",
            video = %self.video.id,
            format = %self.format,
        );

        async move {
            debug!("spawning pipeline");
            let pipeline = Pipeline::spawn(&stages, Some(workdir.path()))?;
            let (mut stream, outcome) = pipeline.stream();

            // Hold the response until the first chunk so failures before
            // any output become proper status codes instead of an empty
            // 200 with a truncated body.
            let first = match stream.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(_)) | None => {
                    drop(stream);
                    let err = match outcome.await {
                        Ok(PipelineOutcome::Failed(err)) => ApiError::from(err),
                        _ => ApiError::internal("pipeline produced no output"),
                    };
                    return Err(err);
                }
            };

            info!(filename = %self.filename, "streaming download");

            // The observer owns the temp dir for the rest of the session
            // and records the terminal state. A client disconnect drops
            // the body, which drops the stream, which aborts the pipeline.
            let session = info_span!("session_observer", video = %self.video.id);
            tokio::spawn(
                async move {
                    match outcome.await {
                        Ok(PipelineOutcome::Completed { bytes }) => {
                            info!(bytes, "session completed");
                        }
                        Ok(PipelineOutcome::Aborted) => {
                            // Normal cancellation, cleanup only.
                            info!("session aborted by client");
                        }
                        Ok(PipelineOutcome::Failed(err)) => {
                            error!(error = %err, "session failed mid-stream");
                        }
                        Err(e) => error!(error = %e, "pipeline task panicked"),
                    }
                    drop(workdir);
                }
                .instrument(session),
            );

            let body = Body::from_stream(tokio_stream::once(Ok::<_, std::io::Error>(first)).chain(stream));

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, self.format.mime_type())
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.filename),
                )
                .body(body)
                .map_err(|e| ApiError::internal(format!("failed to build response: {e}")))
        }
        .instrument(span)
        .await
    }

    #[cfg(test)]
    pub(crate) fn filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::time::Duration;

    use http_body_util::BodyExt;
    use tokio_stream::StreamExt;
    use ytproxy_media::StageSpec;

    fn session(format: &str) -> DownloadSession {
        DownloadSession::validate(Some("dQw4w9WgXcQ"), Some(format), Some("clip")).unwrap()
    }

    /// The observer task removes the scratch dir asynchronously.
    async fn wait_removed(path: &Path) {
        for _ in 0..200 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("workdir {} was not removed", path.display());
    }

    #[test]
    fn validate_rejects_missing_or_bad_input() {
        assert!(DownloadSession::validate(None, Some("mp4"), None).is_err());
        assert!(DownloadSession::validate(Some(""), Some("mp4"), None).is_err());
        assert!(DownloadSession::validate(Some("not-an-id"), Some("mp4"), None).is_err());
        assert!(DownloadSession::validate(Some("dQw4w9WgXcQ"), None, None).is_err());
        assert!(DownloadSession::validate(Some("dQw4w9WgXcQ"), Some("flac"), None).is_err());
    }

    #[test]
    fn validate_accepts_id_or_url_and_builds_filename() {
        let session =
            DownloadSession::validate(Some("dQw4w9WgXcQ"), Some("mp3"), Some("My Song!")).unwrap();
        assert_eq!(session.filename(), "My_Song.mp3");
        assert_eq!(
            session.video.canonical_url,
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );

        let session =
            DownloadSession::validate(Some("https://youtu.be/dQw4w9WgXcQ"), Some("mp4"), None)
                .unwrap();
        assert_eq!(session.filename(), "dQw4w9WgXcQ.mp4");
        assert_eq!(session.format, MediaFormat::Mp4);
    }

    #[tokio::test]
    async fn completed_stream_frames_response_and_removes_workdir() {
        let workdir = tempfile::tempdir().unwrap();
        let path = workdir.path().to_path_buf();
        let stages = vec![StageSpec::test_program("echo").arg("hello")];

        let response = session("mp4").stream_stages(stages, workdir).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"clip.mp4\""
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello\n");
        wait_removed(&path).await;
    }

    #[tokio::test]
    async fn failure_before_output_is_an_error_and_removes_workdir() {
        let workdir = tempfile::tempdir().unwrap();
        let path = workdir.path().to_path_buf();
        let stages = vec![StageSpec::test_program("sh").arg("-c").arg("exit 3")];

        let err = match session("mp4").stream_stages(stages, workdir).await {
            Err(err) => err,
            Ok(_) => panic!("expected the session to fail"),
        };
        assert!(matches!(err, ApiError::BackendUnavailable { .. }));
        // Nothing streamed, so the dir goes away with the failed session.
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn midstream_failure_truncates_body_and_removes_workdir() {
        let workdir = tempfile::tempdir().unwrap();
        let path = workdir.path().to_path_buf();
        let stages = vec![StageSpec::test_program("sh")
            .arg("-c")
            .arg("echo partial; exit 5")];

        let response = session("mp4").stream_stages(stages, workdir).await.unwrap();
        // Headers are already out; the body ends in an error frame.
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.into_body().collect().await.is_err());
        wait_removed(&path).await;
    }

    #[tokio::test]
    async fn dropped_body_aborts_pipeline_and_removes_workdir() {
        let workdir = tempfile::tempdir().unwrap();
        let path = workdir.path().to_path_buf();
        // `yes` streams forever; dropping the body must end the session.
        let stages = vec![StageSpec::test_program("yes")];

        let response = session("mp3").stream_stages(stages, workdir).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");

        let mut body = response.into_body().into_data_stream();
        assert!(body.next().await.unwrap().is_ok());
        drop(body);

        wait_removed(&path).await;
    }
}
