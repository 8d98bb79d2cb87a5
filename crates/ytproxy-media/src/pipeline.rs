//! Stream pipeline: chain extraction and transcode stages at the fd level
//! and supervise them as one cancellable unit.
//!
//! Stage N+1 reads stage N's stdout directly through a kernel pipe, so
//! backpressure needs no bookkeeping: nothing is pulled faster than the
//! final consumer reads. The supervisor task copies the last stage's stdout
//! into a bounded channel and resolves exactly one [`PipelineOutcome`].

use std::path::{Path, PathBuf};
use std::process::Stdio;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::command::{SpawnedStage, StageSpec, KILL_WAIT};
use crate::error::{MediaError, MediaResult};

/// Read granularity for the final stage's stdout.
const READ_CHUNK: usize = 64 * 1024;

/// In-flight chunk budget between the pipeline and the response sink.
const CHANNEL_CAPACITY: usize = 8;

/// Terminal state of a pipeline run. Exactly one is produced per pipeline.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// All bytes flushed, every stage exited 0.
    Completed { bytes: u64 },
    /// A stage failed; downstream output was truncated.
    Failed(MediaError),
    /// The consumer went away; all stages were terminated.
    Aborted,
}

/// Byte stream handed to the response sink.
pub type ByteStream = ReceiverStream<std::io::Result<Bytes>>;

/// A spawned chain of subprocess stages, not yet streaming.
pub struct Pipeline {
    stages: Vec<SpawnedStage>,
    output: ChildStdout,
    workdir: Option<PathBuf>,
}

impl Pipeline {
    /// Spawn every stage, wiring stage N's stdout into stage N+1's stdin.
    ///
    /// `workdir` becomes each stage's working directory, so any scratch
    /// files a tool creates land in the caller's (disposable) directory.
    /// If a later stage fails to spawn, already-running stages are killed
    /// on drop.
    pub fn spawn(specs: &[StageSpec], workdir: Option<&Path>) -> MediaResult<Self> {
        let mut stages: Vec<SpawnedStage> = Vec::with_capacity(specs.len());
        let mut prev_stdout: Option<ChildStdout> = None;

        for spec in specs {
            let stdin = match prev_stdout.take() {
                None => Stdio::null(),
                Some(out) => TryInto::<Stdio>::try_into(out).map_err(MediaError::Io)?,
            };
            let mut stage = spec.spawn(stdin, workdir)?;
            prev_stdout = stage.stdout.take();
            stages.push(stage);
        }

        let output = prev_stdout
            .ok_or_else(|| MediaError::Io(std::io::Error::other("pipeline has no stages")))?;

        Ok(Self {
            stages,
            output,
            workdir: workdir.map(Path::to_path_buf),
        })
    }

    /// Start streaming. Returns the byte stream for the response sink plus
    /// the supervisor handle resolving to the terminal outcome.
    ///
    /// Dropping the stream aborts the pipeline: every live stage is sent a
    /// kill signal and waited on (bounded).
    pub fn stream(self) -> (ByteStream, JoinHandle<PipelineOutcome>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(supervise(self.stages, self.output, tx, self.workdir));
        (ReceiverStream::new(rx), handle)
    }
}

async fn supervise(
    mut stages: Vec<SpawnedStage>,
    mut output: ChildStdout,
    tx: mpsc::Sender<std::io::Result<Bytes>>,
    workdir: Option<PathBuf>,
) -> PipelineOutcome {
    let mut total: u64 = 0;

    loop {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        tokio::select! {
            read = output.read_buf(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    total += n as u64;
                    if tx.send(Ok(buf.freeze())).await.is_err() {
                        return abort(&mut stages, total).await;
                    }
                }
                Err(e) => {
                    kill_all(&mut stages).await;
                    let _ = tx
                        .send(Err(std::io::Error::other("pipeline output read failed")))
                        .await;
                    return PipelineOutcome::Failed(MediaError::Io(e));
                }
            },
            // Receiver dropped while no bytes were flowing: the client
            // disconnected. Stop promptly instead of waiting for output.
            _ = tx.closed() => {
                return abort(&mut stages, total).await;
            }
        }
    }

    drop(output);

    // EOF on the final stage. Reap every stage; every failure is logged,
    // one becomes the reported cause. A stage killed by a signal is
    // usually SIGPIPE after a neighbour died, so a stage with a real
    // non-zero exit status takes precedence over a signal death.
    let mut exit_failure: Option<MediaError> = None;
    let mut signal_failure: Option<MediaError> = None;
    for stage in &mut stages {
        let status = match tokio::time::timeout(KILL_WAIT, stage.child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!(tool = stage.label, error = %e, "failed to reap stage");
                if exit_failure.is_none() {
                    exit_failure = Some(MediaError::Io(e));
                }
                continue;
            }
            Err(_) => {
                // Upstream stage still running after its consumer exited.
                stage.kill().await;
                if exit_failure.is_none() {
                    exit_failure = Some(MediaError::Timeout(KILL_WAIT.as_secs()));
                }
                continue;
            }
        };

        if !status.success() {
            let stderr = stage.take_stderr().await;
            warn!(
                tool = stage.label,
                code = ?status.code(),
                stderr = %stderr,
                "pipeline stage failed"
            );
            let err = MediaError::StageFailed {
                tool: stage.label,
                exit_code: status.code(),
                stderr,
            };
            match status.code() {
                Some(_) if exit_failure.is_none() => exit_failure = Some(err),
                None if signal_failure.is_none() => signal_failure = Some(err),
                _ => {}
            }
        } else {
            debug!(tool = stage.label, "stage completed");
        }
    }
    let failure = exit_failure.or(signal_failure);

    if let Some(dir) = &workdir {
        debug!(workdir = %dir.display(), bytes = total, "pipeline finished");
    }

    match failure {
        Some(err) => {
            // Headers may already be out; all we can do is truncate the
            // stream so the client sees an abnormal close.
            let _ = tx.send(Err(std::io::Error::other(err.to_string()))).await;
            PipelineOutcome::Failed(err)
        }
        None => {
            info!(bytes = total, "pipeline completed");
            PipelineOutcome::Completed { bytes: total }
        }
    }
}

async fn abort(stages: &mut [SpawnedStage], bytes_sent: u64) -> PipelineOutcome {
    info!(bytes = bytes_sent, "consumer gone, aborting pipeline");
    kill_all(stages).await;
    PipelineOutcome::Aborted
}

async fn kill_all(stages: &mut [SpawnedStage]) {
    for stage in stages.iter_mut() {
        stage.kill().await;
    }
}
