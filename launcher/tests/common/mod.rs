// launcher/tests/common/mod.rs
//
// Shared fixtures: shell scripts standing in for the server, a window host
// that records calls, and in-memory capture of forwarded output.

#![allow(dead_code)]

use calcdesk_launcher::config::{Config, ReadinessStrategy};
use calcdesk_launcher::error::LauncherError;
use calcdesk_launcher::supervisor::ServerOutput;
use calcdesk_launcher::window::{WindowHost, WindowSpec};
use std::path::Path;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, DuplexStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCall {
    Created(WindowSpec),
    Loaded(String),
    Error(String),
}

#[derive(Debug, Default)]
pub struct RecordingWindow {
    calls: Mutex<Vec<WindowCall>>,
}

impl RecordingWindow {
    pub fn calls(&self) -> Vec<WindowCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: WindowCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl WindowHost for RecordingWindow {
    fn create(&self, spec: &WindowSpec) -> Result<(), LauncherError> {
        self.push(WindowCall::Created(spec.clone()));
        Ok(())
    }

    fn load_url(&self, url: &str) -> Result<(), LauncherError> {
        self.push(WindowCall::Loaded(url.to_string()));
        Ok(())
    }

    fn show_error(&self, message: &str) -> Result<(), LauncherError> {
        self.push(WindowCall::Error(message.to_string()));
        Ok(())
    }
}

/// Window host whose window can never be created, as without a display
#[derive(Debug, Default)]
pub struct NoDisplayWindow;

impl WindowHost for NoDisplayWindow {
    fn create(&self, _spec: &WindowSpec) -> Result<(), LauncherError> {
        Err(LauncherError::Window("no display".to_string()))
    }

    fn load_url(&self, _url: &str) -> Result<(), LauncherError> {
        panic!("load_url called without a window");
    }

    fn show_error(&self, _message: &str) -> Result<(), LauncherError> {
        panic!("show_error called without a window");
    }
}

/// Write `body` as a shell script the launcher runs as `sh <script>`
pub fn write_server_script(dir: &Path, body: &str) -> String {
    let path = dir.join("app.sh");
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

/// Config running `script` under sh against `cache_dir`, with a short fixed delay
pub fn test_config(cache_dir: &Path, script: String) -> Config {
    let mut config = Config::default();
    config.cache.directory = cache_dir.to_path_buf();
    config.server.interpreter = "sh".into();
    config.server.script = script;
    config.server.port = free_port();
    config.readiness.strategy = ReadinessStrategy::Delay;
    config.readiness.delay_ms = 50;
    config.readiness.poll_interval_ms = 20;
    config.readiness.timeout_secs = 1;
    config.logging.enabled = false;
    config
}

/// A port nothing listens on at the time of the call
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub struct CapturedOutput {
    pub stdout: DuplexStream,
    pub stderr: DuplexStream,
}

impl CapturedOutput {
    pub async fn read_stdout(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.stdout.read_to_end(&mut buf).await.unwrap();
        buf
    }

    pub async fn read_stderr(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.stderr.read_to_end(&mut buf).await.unwrap();
        buf
    }
}

pub fn captured_output() -> (ServerOutput, CapturedOutput) {
    let (stdout_writer, stdout_reader) = tokio::io::duplex(1 << 20);
    let (stderr_writer, stderr_reader) = tokio::io::duplex(1 << 20);
    (
        ServerOutput {
            stdout: Box::new(stdout_writer),
            stderr: Box::new(stderr_writer),
        },
        CapturedOutput {
            stdout: stdout_reader,
            stderr: stderr_reader,
        },
    )
}
