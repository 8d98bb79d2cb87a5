//! Process runner: allow-listed tools, argument-vector stage specs, and
//! supervised spawning with bounded stderr capture.
//!
//! Client-controlled values (video ids, canonical URLs, search queries) only
//! ever enter a stage as discrete argv tokens. Nothing here goes through a
//! shell.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// How much stderr to keep per stage, for diagnostics.
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// How long to wait for a killed stage to exit before giving up on it.
/// `kill_on_drop` still backstops the process if this elapses.
pub(crate) const KILL_WAIT: Duration = Duration::from_secs(5);

/// The only two external tools the proxy is allowed to spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// yt-dlp: resolves a video URL to a raw media stream on stdout.
    Extractor,
    /// ffmpeg: re-encodes stdin to mp3 on stdout.
    Transcoder,
}

impl Tool {
    pub fn binary(&self) -> &'static str {
        match self {
            Tool::Extractor => "yt-dlp",
            Tool::Transcoder => "ffmpeg",
        }
    }

    /// Verify the tool is reachable on PATH.
    pub fn check(&self) -> MediaResult<PathBuf> {
        which::which(self.binary()).map_err(|_| MediaError::ToolNotFound(self.binary()))
    }
}

/// One stage of a pipeline: an allow-listed tool plus its argument vector.
#[derive(Debug, Clone)]
pub struct StageSpec {
    program: String,
    label: &'static str,
    args: Vec<String>,
}

impl StageSpec {
    pub fn new(tool: Tool) -> Self {
        Self {
            program: tool.binary().to_string(),
            label: tool.binary(),
            args: Vec::new(),
        }
    }

    /// Bypass the allow-list so pipeline tests can run against coreutils.
    #[cfg(any(test, feature = "test-util"))]
    pub fn test_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
            label: "test",
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn build_args(&self) -> &[String] {
        &self.args
    }

    /// Spawn the stage with the given stdin source.
    ///
    /// stdout and stderr are always piped; `kill_on_drop` guarantees the
    /// process cannot outlive an abandoned handle.
    pub(crate) fn spawn(
        &self,
        stdin: Stdio,
        workdir: Option<&Path>,
    ) -> MediaResult<SpawnedStage> {
        debug!(tool = self.label, args = ?self.args, "spawning stage");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| MediaError::SpawnFailed {
            tool: self.label,
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::Io(std::io::Error::other("stage stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::Io(std::io::Error::other("stage stderr not captured")))?;

        let stderr_tail = tokio::spawn(read_stderr_tail(stderr));

        Ok(SpawnedStage {
            label: self.label,
            child,
            stdout: Some(stdout),
            stderr_tail,
        })
    }
}

/// A live pipeline stage: the child process, its (takeable) stdout, and the
/// task draining its stderr into a bounded tail buffer.
pub(crate) struct SpawnedStage {
    pub(crate) label: &'static str,
    pub(crate) child: Child,
    pub(crate) stdout: Option<ChildStdout>,
    pub(crate) stderr_tail: JoinHandle<String>,
}

impl SpawnedStage {
    /// Kill the stage and wait (bounded) for it to be reaped.
    pub(crate) async fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            // Already exited is the common case here.
            debug!(tool = self.label, error = %e, "start_kill");
        }
        match tokio::time::timeout(KILL_WAIT, self.child.wait()).await {
            Ok(Ok(status)) => debug!(tool = self.label, %status, "stage killed"),
            Ok(Err(e)) => warn!(tool = self.label, error = %e, "wait after kill failed"),
            Err(_) => warn!(tool = self.label, "stage did not exit after kill"),
        }
    }

    /// Consume the stderr drain task, yielding the captured tail.
    pub(crate) async fn take_stderr(&mut self) -> String {
        match (&mut self.stderr_tail).await {
            Ok(tail) => tail,
            Err(_) => String::new(),
        }
    }
}

/// Drain a stage's stderr, keeping only the last [`STDERR_TAIL_BYTES`].
async fn read_stderr_tail(mut stderr: tokio::process::ChildStderr) -> String {
    let mut tail: Vec<u8> = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > STDERR_TAIL_BYTES {
                    let cut = tail.len() - STDERR_TAIL_BYTES;
                    tail.drain(..cut);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_binaries_are_allow_listed() {
        assert_eq!(Tool::Extractor.binary(), "yt-dlp");
        assert_eq!(Tool::Transcoder.binary(), "ffmpeg");
    }

    #[test]
    fn stage_spec_keeps_args_as_discrete_tokens() {
        let spec = StageSpec::new(Tool::Extractor)
            .arg("-f")
            .arg("bestaudio/best")
            .args(["-o", "-"])
            .arg("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(
            spec.build_args(),
            [
                "-f",
                "bestaudio/best",
                "-o",
                "-",
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
            ]
        );
        assert_eq!(spec.label(), "yt-dlp");
    }

    #[tokio::test]
    async fn stderr_tail_is_bounded() {
        // Feed >8KiB through a real child's stderr and check the cap.
        let mut spawned = StageSpec::test_program("sh")
            .arg("-c")
            .arg("head -c 20000 /dev/zero | tr '\\0' 'x' 1>&2")
            .spawn(Stdio::null(), None)
            .unwrap();
        let _ = spawned.child.wait().await.unwrap();
        let tail = spawned.take_stderr().await;
        assert_eq!(tail.len(), STDERR_TAIL_BYTES);
        assert!(tail.bytes().all(|b| b == b'x'));
    }
}
