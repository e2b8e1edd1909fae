// launcher/src/supervisor.rs
//
// Spawns the web-application server and relays its output and exit status.

use crate::config::ServerConfig;
use crate::error::LauncherError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{oneshot, watch};

const FORWARD_CHUNK_SIZE: usize = 8 * 1024;

/// How the server process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    /// Ended without an exit code (killed by a signal)
    Terminated,
    /// Waiting on the process failed
    Unknown(String),
}

impl ExitOutcome {
    fn from_wait(result: io::Result<ExitStatus>) -> Self {
        match result {
            Ok(status) => match status.code() {
                Some(code) => Self::Exited(code),
                None => Self::Terminated,
            },
            Err(e) => Self::Unknown(e.to_string()),
        }
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "code {}", code),
            Self::Terminated => write!(f, "no exit code (terminated by signal)"),
            Self::Unknown(reason) => write!(f, "unknown status ({})", reason),
        }
    }
}

type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Destinations for the server's stdout and stderr bytes
pub struct ServerOutput {
    pub stdout: Sink,
    pub stderr: Sink,
}

impl ServerOutput {
    /// Forward to the launcher's own stdout and stderr
    pub fn inherit() -> Self {
        Self {
            stdout: Box::new(tokio::io::stdout()),
            stderr: Box::new(tokio::io::stderr()),
        }
    }
}

/// Watches forwarded bytes for a line containing `pattern`
///
/// Only the tail of the current line that could still begin a match is
/// buffered, so output without newlines does not grow the buffer.
pub struct LineWatch {
    pattern: String,
    pending: Vec<u8>,
    line_matched: bool,
    seen: watch::Sender<bool>,
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

impl LineWatch {
    pub fn new(pattern: impl Into<String>, seen: watch::Sender<bool>) -> Self {
        Self {
            pattern: pattern.into(),
            pending: Vec::new(),
            line_matched: false,
            seen,
        }
    }

    fn feed(&mut self, chunk: &[u8]) {
        if *self.seen.borrow() {
            return;
        }
        let pattern = self.pattern.as_bytes();

        for segment in chunk.split_inclusive(|&b| b == b'\n') {
            self.pending.extend_from_slice(segment);
            if !self.line_matched && contains(&self.pending, pattern) {
                self.line_matched = true;
            }

            if segment.ends_with(b"\n") {
                if self.line_matched {
                    self.seen.send_replace(true);
                    self.pending = Vec::new();
                    return;
                }
                self.pending.clear();
            } else {
                let keep = pattern.len().saturating_sub(1);
                if self.pending.len() > keep {
                    self.pending.drain(..self.pending.len() - keep);
                }
            }
        }
    }
}

/// Copy `reader` into `writer` chunk by chunk, flushing after every chunk
///
/// Bytes are passed through unmodified and in arrival order. Returns the
/// number of bytes forwarded once the reader reaches EOF.
pub async fn forward_stream<R, W>(
    mut reader: R,
    mut writer: W,
    mut watch: Option<LineWatch>,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; FORWARD_CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        total += n as u64;

        if let Some(watch) = watch.as_mut() {
            watch.feed(&buf[..n]);
        }
    }

    writer.shutdown().await?;
    Ok(total)
}

/// Handle to the running server process
///
/// The child itself is owned by a background task that waits on it; the
/// handle talks to that task through channels.
pub struct ServerHandle {
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
    exit_rx: watch::Receiver<Option<ExitOutcome>>,
    exited_at: watch::Receiver<Option<DateTime<Utc>>>,
    ready_rx: watch::Receiver<bool>,
}

impl ServerHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since spawn, or how long the server ran once it has exited
    pub fn uptime(&self) -> chrono::Duration {
        let exited_at = *self.exited_at.borrow();
        exited_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Exit outcome if the process has already ended
    pub fn exited(&self) -> Option<ExitOutcome> {
        self.exit_rx.borrow().clone()
    }

    pub async fn wait_exit(&self) -> ExitOutcome {
        let mut rx = self.exit_rx.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(ExitOutcome::Terminated),
            Err(_) => ExitOutcome::Unknown("exit watcher stopped".to_string()),
        };
        outcome
    }

    /// Resolves true once the watched line was printed, false if stdout closed first
    pub async fn ready_line_seen(&self) -> bool {
        let mut rx = self.ready_rx.clone();
        let seen = rx.wait_for(|seen| *seen).await.is_ok();
        seen
    }

    /// Kill the server and wait for it to exit
    pub async fn stop(&self) -> ExitOutcome {
        let kill_tx = self
            .kill_tx
            .lock()
            .map(|mut guard| guard.take())
            .unwrap_or(None);

        if let Some(tx) = kill_tx {
            if self.exited().is_none() {
                tracing::info!("Stopping server process (pid {:?})", self.pid);
            }
            let _ = tx.send(());
        }
        self.wait_exit().await
    }
}

/// Spawn the server: `{interpreter} {script}`, nothing else configured
///
/// Must be called from within a tokio runtime.
pub fn spawn_server(
    config: &ServerConfig,
    ready_line: Option<String>,
    output: ServerOutput,
) -> Result<ServerHandle, LauncherError> {
    let program = config.interpreter.display().to_string();

    let mut child = Command::new(&config.interpreter)
        .arg(&config.script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| LauncherError::Spawn {
            program: program.clone(),
            source,
        })?;

    let pid = child.id();
    tracing::info!(pid = ?pid, "Started server process: {} {}", program, config.script);

    let ServerOutput {
        stdout: stdout_sink,
        stderr: stderr_sink,
    } = output;
    let (ready_tx, ready_rx) = watch::channel(false);
    let line_watch = ready_line.map(|pattern| LineWatch::new(pattern, ready_tx));

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            if let Err(e) = forward_stream(stdout, stdout_sink, line_watch).await {
                tracing::warn!("Server stdout forwarding stopped: {}", e);
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            if let Err(e) = forward_stream(stderr, stderr_sink, None).await {
                tracing::warn!("Server stderr forwarding stopped: {}", e);
            }
        });
    }

    let started_at = Utc::now();
    let (kill_tx, kill_rx) = oneshot::channel::<()>();
    let (exit_tx, exit_rx) = watch::channel(None);
    let (exited_at_tx, exited_at) = watch::channel(None);

    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            Ok(()) = kill_rx => {
                if let Err(e) = child.start_kill() {
                    tracing::warn!("Failed to kill server process: {}", e);
                }
                child.wait().await
            }
        };

        let outcome = ExitOutcome::from_wait(status);
        let now = Utc::now();
        tracing::info!(
            code = ?outcome.code(),
            uptime_secs = (now - started_at).num_seconds(),
            "Server process exited with {}",
            outcome
        );
        exited_at_tx.send_replace(Some(now));
        exit_tx.send_replace(Some(outcome));
    });

    Ok(ServerHandle {
        pid,
        started_at,
        kill_tx: Mutex::new(Some(kill_tx)),
        exit_rx,
        exited_at,
        ready_rx,
    })
}
