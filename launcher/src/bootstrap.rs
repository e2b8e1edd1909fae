use crate::config::Config;
use crate::logging;
use tracing_appender::non_blocking::WorkerGuard;

pub struct Application {
    pub config: Config,
    /// Keeps the file log writer alive; drop it last
    pub log_guard: Option<WorkerGuard>,
}

/// Load configuration and initialize logging
pub fn setup() -> Application {
    let config = load_config();
    let log_guard = logging::init(&config.logging);

    tracing::info!("Starting CalcDesk launcher...");
    tracing::info!("Launcher Version: {}", crate::BUILD_INFO);

    if config.logging.enabled {
        tracing::info!(
            "File logging enabled: directory={}, prefix={}, rotation={}",
            config.logging.directory,
            config.logging.file_prefix,
            config.logging.rotation
        );
    }
    match config.to_toml() {
        Ok(rendered) => tracing::debug!("Effective configuration:\n{}", rendered),
        Err(e) => tracing::warn!("{:#}", e),
    }

    Application { config, log_guard }
}

/// Directory holding config.toml: `CONFIG_DIR`, else the executable's directory
pub fn config_dir() -> String {
    std::env::var("CONFIG_DIR").unwrap_or_else(|_| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_string_lossy().into_owned()))
            .unwrap_or_else(|| ".".to_string())
    })
}

pub fn load_config() -> Config {
    let config_base = format!("{}/config", config_dir());

    // Logging is not initialized yet
    match Config::from_file(&config_base) {
        Ok(cfg) => {
            eprintln!("Configuration loaded successfully from {}", config_base);
            cfg
        }
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}, using defaults", e);
            Config::default()
        }
    }
}
