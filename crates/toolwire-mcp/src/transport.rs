//! Line transport over a child process's stdio.
//!
//! Frames are newline-terminated UTF-8 lines. Stdout carries protocol frames;
//! stderr is drained continuously into a bounded tail buffer, which is
//! attached to timeout and end-of-stream errors.

use crate::error::McpError;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use toolwire_types::tail_str;

/// Bytes of stderr kept for diagnostics.
const STDERR_TAIL_BYTES: usize = 16 * 1024;

/// How long `terminate` waits after closing stdin, and again after killing.
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// The executable-search variable that must always reach the child.
const PATH_VAR: &str = "PATH";

/// Owns one child process and its three pipes.
pub struct LineTransport {
    command: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr_tail: Arc<Mutex<String>>,
    stderr_handle: Option<JoinHandle<()>>,
    terminated: bool,
}

impl LineTransport {
    /// Spawn `command` with exactly the given environment (plus `PATH`), or
    /// with the parent environment overlaid by `env` when `inherit_env` is set.
    pub fn start(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        inherit_env: bool,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !inherit_env {
            cmd.env_clear();
        }
        cmd.envs(child_env(env, std::env::var(PATH_VAR).ok()));

        let spawn_err = |source| McpError::Spawn {
            command: command.to_string(),
            source,
        };
        let mut child = cmd.spawn().map_err(spawn_err)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_err(std::io::Error::other("stdin was not captured")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_err(std::io::Error::other("stdout was not captured")))?;

        let stderr_tail = Arc::new(Mutex::new(String::new()));
        let stderr_handle = child
            .stderr
            .take()
            .map(|stderr| spawn_stderr_drain(command.to_string(), stderr, Arc::clone(&stderr_tail)));

        tracing::debug!(command, pid = child.id(), "spawned tool server");

        Ok(Self {
            command: command.to_string(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            stderr_tail,
            stderr_handle,
            terminated: false,
        })
    }

    /// Write one frame and flush it.
    pub async fn write_line(&mut self, line: &str) -> Result<(), McpError> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            McpError::BrokenPipe(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin already closed",
            ))
        })?;

        let mut frame = String::with_capacity(line.len() + 1);
        frame.push_str(line);
        frame.push('\n');

        stdin
            .write_all(frame.as_bytes())
            .await
            .map_err(McpError::BrokenPipe)?;
        stdin.flush().await.map_err(McpError::BrokenPipe)
    }

    /// Read one frame, waiting at most `timeout`.
    ///
    /// On timeout the process is left running; the captured stderr tail is
    /// returned inside the error.
    pub async fn read_line(&mut self, timeout: Duration) -> Result<String, McpError> {
        match tokio::time::timeout(timeout, self.stdout.next_line()).await {
            Ok(Ok(Some(line))) => Ok(line),
            Ok(Ok(None)) => Err(McpError::Eof {
                diagnostics: self.drain_diagnostics(),
            }),
            Ok(Err(e)) => Err(McpError::Io(e)),
            Err(_) => Err(McpError::ReadTimeout {
                timeout_ms: timeout.as_millis() as u64,
                diagnostics: self.drain_diagnostics(),
            }),
        }
    }

    /// Take whatever stderr has been captured so far. Never blocks on the child.
    pub fn drain_diagnostics(&self) -> String {
        let mut tail = self
            .stderr_tail
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *tail)
    }

    /// Close stdin, give the child a grace period to exit, then kill it.
    /// Idempotent.
    pub async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        drop(self.stdin.take());

        let graceful = tokio::time::timeout(EXIT_GRACE, self.child.wait()).await;
        if graceful.is_err() {
            tracing::debug!(command = %self.command, "tool server ignored EOF, killing");
            let _ = self.child.start_kill();
            if tokio::time::timeout(EXIT_GRACE, self.child.wait())
                .await
                .is_err()
            {
                tracing::warn!(command = %self.command, "tool server did not exit after kill");
            }
        }

        if let Some(handle) = self.stderr_handle.take() {
            handle.abort();
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// OS process id, if the child has not been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }
}

/// Build the child's environment overlay, guaranteeing `PATH` is present.
fn child_env(env: &HashMap<String, String>, parent_path: Option<String>) -> HashMap<String, String> {
    let mut out = env.clone();
    if !out.contains_key(PATH_VAR) {
        if let Some(path) = parent_path {
            out.insert(PATH_VAR.to_string(), path);
        }
    }
    out
}

fn spawn_stderr_drain(
    command: String,
    stderr: ChildStderr,
    tail: Arc<Mutex<String>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = String::from_utf8_lossy(&buf);
            tracing::debug!(server = %command, "stderr: {}", line.trim_end());

            let mut tail = tail.lock().unwrap_or_else(PoisonError::into_inner);
            tail.push_str(&line);
            if tail.len() > STDERR_TAIL_BYTES {
                let kept = tail_str(&tail, STDERR_TAIL_BYTES).to_string();
                *tail = kept;
            }
        }
    })
}
