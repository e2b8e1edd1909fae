use crate::config::LoggingConfig;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with stderr output and optional rolling file output
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the lifetime of the process.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    // Default to info level for all modules; can be overridden via RUST_LOG env var
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    // stdout belongs to the server's forwarded output
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    if !config.enabled {
        subscriber.init();
        return None;
    }

    use tracing_appender::rolling;

    if let Err(e) = std::fs::create_dir_all(&config.directory) {
        eprintln!("Failed to create log directory {}: {}", config.directory, e);
    }

    cleanup_old_logs(config);

    let file_appender = match config.rotation.as_str() {
        "hourly" => rolling::hourly(&config.directory, &config.file_prefix),
        "never" => rolling::never(&config.directory, &config.file_prefix),
        _ => rolling::daily(&config.directory, &config.file_prefix),
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    subscriber
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Some(guard)
}

/// Log files in the configured directory, newest first
fn collect_log_files(config: &LoggingConfig) -> Vec<(PathBuf, SystemTime)> {
    let entries = match std::fs::read_dir(Path::new(&config.directory)) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Failed to read log directory: {}", e);
            return Vec::new();
        }
    };

    let mut files: Vec<_> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let name = entry.file_name();
            if !name.to_str()?.starts_with(&config.file_prefix) {
                return None;
            }
            Some((entry.path(), metadata.modified().ok()?))
        })
        .collect();

    files.sort_by(|a, b| b.1.cmp(&a.1));
    files
}

/// Delete log files beyond `max_files` or older than `max_age_days`
///
/// Returns the number of files deleted. Zero limits disable the check.
pub fn cleanup_old_logs(config: &LoggingConfig) -> usize {
    if config.max_files == 0 && config.max_age_days == 0 {
        return 0;
    }
    if !Path::new(&config.directory).exists() {
        return 0;
    }

    let now = SystemTime::now();
    let max_age = Duration::from_secs(u64::from(config.max_age_days) * 24 * 60 * 60);
    let mut deleted = 0;

    for (idx, (path, modified)) in collect_log_files(config).iter().enumerate() {
        let over_count = config.max_files > 0 && idx >= config.max_files as usize;
        let over_age = config.max_age_days > 0
            && now
                .duration_since(*modified)
                .map(|age| age > max_age)
                .unwrap_or(false);

        if !(over_count || over_age) {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => deleted += 1,
            Err(e) => eprintln!("Failed to delete log file {:?}: {}", path, e),
        }
    }

    if deleted > 0 {
        eprintln!("Cleaned up {} old log file(s)", deleted);
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_for(dir: &Path, max_files: u32, max_age_days: u32) -> LoggingConfig {
        LoggingConfig {
            directory: dir.to_string_lossy().into_owned(),
            max_files,
            max_age_days,
            ..Default::default()
        }
    }

    #[test]
    fn test_cleanup_keeps_newest_files() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            let path = dir.path().join(format!("calcdesk.2026-01-0{}", i + 1));
            std::fs::write(&path, b"log").unwrap();
            let file = std::fs::File::options().write(true).open(&path).unwrap();
            file.set_modified(SystemTime::now() - Duration::from_secs(3600 * (5 - i)))
                .unwrap();
        }
        std::fs::write(dir.path().join("other.txt"), b"keep").unwrap();

        let deleted = cleanup_old_logs(&config_for(dir.path(), 2, 0));

        assert_eq!(deleted, 3);
        assert!(dir.path().join("calcdesk.2026-01-05").exists());
        assert!(dir.path().join("calcdesk.2026-01-04").exists());
        assert!(!dir.path().join("calcdesk.2026-01-01").exists());
        assert!(dir.path().join("other.txt").exists());
    }

    #[test]
    fn test_cleanup_removes_expired_files() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("calcdesk.old");
        std::fs::write(&old, b"log").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3 * 24 * 3600))
            .unwrap();
        std::fs::write(dir.path().join("calcdesk.new"), b"log").unwrap();

        let deleted = cleanup_old_logs(&config_for(dir.path(), 0, 1));

        assert_eq!(deleted, 1);
        assert!(!old.exists());
        assert!(dir.path().join("calcdesk.new").exists());
    }

    #[test]
    fn test_cleanup_unlimited_is_noop() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("calcdesk.log"), b"log").unwrap();
        assert_eq!(cleanup_old_logs(&config_for(dir.path(), 0, 0)), 0);
    }
}
