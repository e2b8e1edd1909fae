use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DeleteFailureKind, FailureAction};
use crate::readiness::ReadinessProbe;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Image cache cleared before the server starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory whose direct entries are deleted at startup
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,
    /// Clear the directory on startup
    #[serde(default = "default_true")]
    pub clear_on_start: bool,
    #[serde(default = "default_skip")]
    pub on_not_found: FailureAction,
    #[serde(default = "default_abort")]
    pub on_permission_denied: FailureAction,
    #[serde(default = "default_abort")]
    pub on_in_use: FailureAction,
    #[serde(default = "default_abort")]
    pub on_other: FailureAction,
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from("./static/images")
}
fn default_true() -> bool {
    true
}
fn default_skip() -> FailureAction {
    FailureAction::Skip
}
fn default_abort() -> FailureAction {
    FailureAction::Abort
}

impl CacheConfig {
    /// Action to take when deleting a cached file fails with the given kind
    pub fn action_for(&self, kind: DeleteFailureKind) -> FailureAction {
        match kind {
            DeleteFailureKind::NotFound => self.on_not_found,
            DeleteFailureKind::PermissionDenied => self.on_permission_denied,
            DeleteFailureKind::InUse => self.on_in_use,
            DeleteFailureKind::Other => self.on_other,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            clear_on_start: true,
            on_not_found: FailureAction::Skip,
            on_permission_denied: FailureAction::Abort,
            on_in_use: FailureAction::Abort,
            on_other: FailureAction::Abort,
        }
    }
}

/// The external web-application server process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interpreter executable, relative to the working directory
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,
    /// Script passed as the only argument
    #[serde(default = "default_script")]
    pub script: String,
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_interpreter() -> PathBuf {
    PathBuf::from("./interpreters/Python-3.11.1/python")
}
fn default_script() -> String {
    "app.py".to_string()
}
fn default_server_host() -> String {
    "127.0.0.1".to_string()
}
fn default_server_port() -> u16 {
    5000
}

impl ServerConfig {
    /// URL the window loads once the server is ready
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Address polled by the port readiness probe
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script: default_script(),
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_title")]
    pub title: String,
    #[serde(default = "default_window_width")]
    pub width: u32,
    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_window_title() -> String {
    "CalcDesk".to_string()
}
fn default_window_width() -> u32 {
    800
}
fn default_window_height() -> u32 {
    600
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_window_title(),
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

/// How the launcher decides the server is ready to serve the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStrategy {
    /// Poll the server's TCP port until it accepts a connection
    Port,
    /// Wait a fixed delay after window creation
    Delay,
    /// Wait for a known line on the server's stdout
    OutputLine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_strategy")]
    pub strategy: ReadinessStrategy,
    /// Delay before loading the URL (delay strategy)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up after this long (port and output_line strategies)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Substring of a stdout line announcing the server is up (output_line strategy)
    #[serde(default = "default_ready_line")]
    pub ready_line: String,
}

fn default_strategy() -> ReadinessStrategy {
    ReadinessStrategy::Port
}
fn default_delay_ms() -> u64 {
    1000
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_ready_line() -> String {
    "Running on".to_string()
}

impl ReadinessConfig {
    /// Build the probe for this configuration against the given server
    pub fn probe(&self, server: &ServerConfig) -> ReadinessProbe {
        let timeout = Duration::from_secs(self.timeout_secs);
        match self.strategy {
            ReadinessStrategy::Delay => ReadinessProbe::FixedDelay(Duration::from_millis(self.delay_ms)),
            ReadinessStrategy::Port => ReadinessProbe::TcpPort {
                address: server.socket_address(),
                interval: Duration::from_millis(self.poll_interval_ms),
                timeout,
            },
            ReadinessStrategy::OutputLine => ReadinessProbe::OutputLine { timeout },
        }
    }

    /// Line the supervisor should watch for, if the strategy needs one
    pub fn watched_line(&self) -> Option<String> {
        match self.strategy {
            ReadinessStrategy::OutputLine => Some(self.ready_line.clone()),
            _ => None,
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            delay_ms: default_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
            ready_line: default_ready_line(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Inject the dimension reporter and form relay scripts into the window
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable file logging
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,
    /// Directory for log files (relative to working directory or absolute path)
    #[serde(default = "default_log_directory")]
    pub directory: String,
    /// Prefix for log file names
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
    /// Rotation strategy: "daily", "hourly", or "never"
    #[serde(default = "default_log_rotation")]
    pub rotation: String,
    /// Maximum number of log files to keep (0 = unlimited)
    #[serde(default = "default_max_files")]
    pub max_files: u32,
    /// Maximum age of log files in days (0 = unlimited)
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

fn default_logging_enabled() -> bool {
    true
}
fn default_log_directory() -> String {
    "logs".to_string()
}
fn default_log_file_prefix() -> String {
    "calcdesk".to_string()
}
fn default_log_rotation() -> String {
    "daily".to_string()
}
fn default_max_files() -> u32 {
    30
}
fn default_max_age_days() -> u32 {
    90
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            directory: default_log_directory(),
            file_prefix: default_log_file_prefix(),
            rotation: default_log_rotation(),
            max_files: default_max_files(),
            max_age_days: default_max_age_days(),
        }
    }
}

impl Config {
    /// Load config from layered TOML files
    ///
    /// Loads configuration files in the following order (later files override earlier):
    /// 1. {base_name}.toml (required, e.g., config.toml)
    /// 2. {base_name}.{ENV}.toml (optional, only if CONFIG_ENV is set)
    /// 3. {base_name}.local.toml (optional, for personal overrides, git-ignored)
    pub fn from_file<P: AsRef<Path>>(base_name: P) -> Result<Self> {
        let base_path = base_name.as_ref();
        let base_str = base_path.to_str().context("Invalid base path")?;

        let mut builder =
            config::Config::builder().add_source(config::File::with_name(base_str));

        if let Ok(env) = std::env::var("CONFIG_ENV") {
            let env_config = format!("{}.{}", base_str, env);
            builder = builder.add_source(config::File::with_name(&env_config).required(false));
        }

        let local_config = format!("{}.local", base_str);
        builder = builder.add_source(config::File::with_name(&local_config).required(false));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.directory, PathBuf::from("./static/images"));
        assert!(config.cache.clear_on_start);
        assert_eq!(
            config.server.interpreter,
            PathBuf::from("./interpreters/Python-3.11.1/python")
        );
        assert_eq!(config.server.script, "app.py");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.readiness.strategy, ReadinessStrategy::Port);
        assert_eq!(config.readiness.delay_ms, 1000);
    }

    #[test]
    fn test_server_url() {
        let config = Config::default();
        assert_eq!(config.server.url(), "http://127.0.0.1:5000");
        assert_eq!(config.server.socket_address(), "127.0.0.1:5000");
    }

    #[test]
    fn test_cache_policy_defaults() {
        let cache = CacheConfig::default();
        assert_eq!(cache.action_for(DeleteFailureKind::NotFound), FailureAction::Skip);
        assert_eq!(
            cache.action_for(DeleteFailureKind::PermissionDenied),
            FailureAction::Abort
        );
        assert_eq!(cache.action_for(DeleteFailureKind::InUse), FailureAction::Abort);
        assert_eq!(cache.action_for(DeleteFailureKind::Other), FailureAction::Abort);
    }

    #[test]
    fn test_probe_selection() {
        let server = ServerConfig::default();
        let mut readiness = ReadinessConfig {
            strategy: ReadinessStrategy::Delay,
            delay_ms: 500,
            ..Default::default()
        };
        assert_eq!(
            readiness.probe(&server),
            ReadinessProbe::FixedDelay(Duration::from_millis(500))
        );
        assert_eq!(readiness.watched_line(), None);

        readiness.strategy = ReadinessStrategy::OutputLine;
        assert_eq!(readiness.watched_line().as_deref(), Some("Running on"));

        readiness.strategy = ReadinessStrategy::Port;
        match readiness.probe(&server) {
            ReadinessProbe::TcpPort { address, .. } => assert_eq!(address, "127.0.0.1:5000"),
            other => panic!("unexpected probe: {:?}", other),
        }
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[cache]
directory = "cache/img"
clear_on_start = false
on_permission_denied = "skip"

[server]
port = 5050

[readiness]
strategy = "delay"
delay_ms = 500
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cache.directory, PathBuf::from("cache/img"));
        assert!(!config.cache.clear_on_start);
        assert_eq!(config.cache.on_permission_denied, FailureAction::Skip);
        assert_eq!(config.cache.on_other, FailureAction::Abort);
        assert_eq!(config.server.port, 5050);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.readiness.strategy, ReadinessStrategy::Delay);
        assert_eq!(config.readiness.delay_ms, 500);
        assert_eq!(config.window.width, 800);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = Config::default().to_toml().unwrap();
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[readiness]"));
    }

    #[test]
    #[serial]
    fn test_from_file_layers_local_override() {
        std::env::remove_var("CONFIG_ENV");
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[server]\nport = 6000\n\n[window]\ntitle = \"Base\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("config.local.toml"), "[server]\nport = 7000\n").unwrap();

        let config = Config::from_file(dir.path().join("config")).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.window.title, "Base");
    }

    #[test]
    #[serial]
    fn test_from_file_env_layer() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[readiness]\ndelay_ms = 1000\n").unwrap();
        std::fs::write(dir.path().join("config.dev.toml"), "[readiness]\ndelay_ms = 500\n")
            .unwrap();

        std::env::set_var("CONFIG_ENV", "dev");
        let config = Config::from_file(dir.path().join("config"));
        std::env::remove_var("CONFIG_ENV");

        assert_eq!(config.unwrap().readiness.delay_ms, 500);
    }

    #[test]
    #[serial]
    fn test_from_file_missing_base_fails() {
        std::env::remove_var("CONFIG_ENV");
        let dir = tempdir().unwrap();
        assert!(Config::from_file(dir.path().join("config")).is_err());
    }
}
