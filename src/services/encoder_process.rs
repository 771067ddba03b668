//! Supervises a single spawned ffmpeg child process end to end: spawn,
//! stream its stdout to the caller, classify how it exited, kill on demand.
//!
//! One process per stream session; no cross-client buffer sharing.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};

/// Exit codes above this are treated as signal termination on Unix
/// (128 + signal number), distinct from an ordinary non-zero ffmpeg failure.
const SIGNAL_EXIT_BASE: i32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Spawning,
    Running,
    Completed,
    Errored,
    Killed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderExitKind {
    Completed,
    /// A non-zero exit that followed at least one byte of output; ffmpeg
    /// exiting 255 after the downstream reader went away is the common case.
    BenignEof,
    Crashed(String),
    Killed,
}

pub struct EncoderProcess {
    channel: u32,
    child: Child,
    bytes_written: Arc<AtomicU64>,
    state: EncoderState,
}

impl EncoderProcess {
    pub async fn spawn(channel: u32, command: &str, args: &[String]) -> AppResult<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        cmd.kill_on_drop(true);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::EncoderMissing { command: command.to_string() }
            } else {
                AppError::Io(e)
            }
        })?;

        if let Some(stderr) = child.stderr.take() {
            let channel_for_log = channel;
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(channel = channel_for_log, "ffmpeg: {line}");
                }
            });
        }

        Ok(Self {
            channel,
            child,
            bytes_written: Arc::new(AtomicU64::new(0)),
            state: EncoderState::Spawning,
        })
    }

    /// Takes ownership of the child's stdout; the caller is responsible for
    /// calling [`record_bytes`](Self::record_bytes) as it reads.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.state = EncoderState::Running;
        self.child.stdout.take()
    }

    pub fn bytes_counter(&self) -> Arc<AtomicU64> {
        self.bytes_written.clone()
    }

    pub fn record_bytes(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Non-blocking poll of whether the process has exited.
    pub fn try_wait(&mut self) -> AppResult<Option<EncoderExitKind>> {
        match self.child.try_wait().map_err(AppError::Io)? {
            Some(status) => {
                let kind = classify_exit(status.code(), self.bytes_written());
                self.state = match &kind {
                    EncoderExitKind::Completed | EncoderExitKind::BenignEof => EncoderState::Completed,
                    EncoderExitKind::Crashed(_) => EncoderState::Errored,
                    EncoderExitKind::Killed => EncoderState::Killed,
                };
                Ok(Some(kind))
            }
            None => Ok(None),
        }
    }

    pub async fn wait(&mut self) -> AppResult<EncoderExitKind> {
        let status = self.child.wait().await.map_err(AppError::Io)?;
        let kind = classify_exit(status.code(), self.bytes_written());
        self.state = match &kind {
            EncoderExitKind::Completed | EncoderExitKind::BenignEof => EncoderState::Completed,
            EncoderExitKind::Crashed(_) => EncoderState::Errored,
            EncoderExitKind::Killed => EncoderState::Killed,
        };
        Ok(kind)
    }

    pub async fn kill(&mut self) -> AppResult<()> {
        if let Err(e) = self.child.kill().await {
            warn!(channel = self.channel, "failed to kill encoder process: {e}");
            return Err(AppError::Io(e));
        }
        self.state = EncoderState::Killed;
        Ok(())
    }
}

impl Drop for EncoderProcess {
    fn drop(&mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!(channel = self.channel, "failed to kill encoder process on drop: {e}");
        }
    }
}

/// Reads from `stdout`, forwarding chunks to `sink` and incrementing
/// `bytes_written` as it goes. Returns once the process closes its pipe.
pub async fn drain_stdout<F>(mut stdout: ChildStdout, bytes_written: Arc<AtomicU64>, mut sink: F) -> AppResult<()>
where
    F: FnMut(Vec<u8>) -> bool,
{
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = stdout.read(&mut buf).await.map_err(AppError::Io)?;
        if n == 0 {
            return Ok(());
        }
        bytes_written.fetch_add(n as u64, Ordering::Relaxed);
        if !sink(buf[..n].to_vec()) {
            return Ok(());
        }
    }
}

/// No exit code at all means the process died to a signal (SIGKILL on
/// Unix reports `None` from `ExitStatus::code`); treat that as a kill.
/// A 255 exit after at least one byte reached the client is the ordinary
/// "downstream went away, ffmpeg got SIGPIPE" shutdown and isn't a crash.
fn classify_exit(code: Option<i32>, bytes_written: u64) -> EncoderExitKind {
    match code {
        None => EncoderExitKind::Killed,
        Some(0) => EncoderExitKind::Completed,
        Some(255) if bytes_written > 0 => EncoderExitKind::BenignEof,
        Some(c) if c >= SIGNAL_EXIT_BASE && bytes_written > 0 => EncoderExitKind::BenignEof,
        Some(c) => EncoderExitKind::Crashed(format!("exit code {c}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_is_completed() {
        assert_eq!(classify_exit(Some(0), 0), EncoderExitKind::Completed);
    }

    #[test]
    fn exit_255_with_bytes_is_benign() {
        assert_eq!(classify_exit(Some(255), 1_000), EncoderExitKind::BenignEof);
    }

    #[test]
    fn exit_255_with_no_bytes_is_crash() {
        assert!(matches!(classify_exit(Some(255), 0), EncoderExitKind::Crashed(_)));
    }

    #[test]
    fn signal_termination_with_no_code_is_killed() {
        assert_eq!(classify_exit(None, 500), EncoderExitKind::Killed);
    }

    #[test]
    fn genuine_error_code_with_no_bytes_is_crash() {
        assert!(matches!(classify_exit(Some(1), 0), EncoderExitKind::Crashed(_)));
    }

    #[tokio::test]
    async fn spawn_missing_command_reports_encoder_missing() {
        let result = EncoderProcess::spawn(1, "definitely-not-a-real-ffmpeg-binary", &[]).await;
        assert!(matches!(result, Err(AppError::EncoderMissing { .. })));
    }

    #[tokio::test]
    async fn spawn_and_wait_on_real_process() {
        let mut process = EncoderProcess::spawn(1, "sh", &["-c".to_string(), "exit 0".to_string()])
            .await
            .expect("sh should be available");
        let exit = process.wait().await.expect("wait should succeed");
        assert_eq!(exit, EncoderExitKind::Completed);
    }
}
