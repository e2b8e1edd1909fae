// launcher/src/cache.rs
//
// Clears the image cache left behind by a previous server run.

use crate::config::CacheConfig;
use crate::error::{DeleteFailureKind, FailureAction, LauncherError};
use std::path::PathBuf;

/// Outcome of a successful cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub skipped: usize,
}

/// Deletes every direct entry of the cache directory
///
/// Entries are treated as flat files: a subdirectory cannot be removed and is
/// reported as a failure of kind `Other`.
#[derive(Debug, Clone)]
pub struct CacheCleaner {
    config: CacheConfig,
}

impl CacheCleaner {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.config.directory
    }

    pub async fn clear(&self) -> Result<CleanupReport, LauncherError> {
        let dir = &self.config.directory;
        let list_err = |source: std::io::Error| LauncherError::CacheList {
            path: dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(list_err)?;
        let mut report = CleanupReport::default();

        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    report.removed += 1;
                    tracing::debug!("Deleted cached file {}", path.display());
                }
                Err(source) => {
                    let kind = DeleteFailureKind::classify(&source);
                    match self.config.action_for(kind) {
                        FailureAction::Skip => {
                            report.skipped += 1;
                            tracing::warn!(
                                "Skipping cached file {} ({}): {}",
                                path.display(),
                                kind,
                                source
                            );
                        }
                        FailureAction::Abort => {
                            return Err(LauncherError::CacheDelete { path, kind, source });
                        }
                    }
                }
            }
        }

        tracing::info!(
            removed = report.removed,
            skipped = report.skipped,
            "Cleared cache directory {}",
            dir.display()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cleaner_for(dir: &std::path::Path) -> CacheCleaner {
        CacheCleaner::new(CacheConfig {
            directory: dir.to_path_buf(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_clear_empties_populated_directory() {
        let dir = tempdir().unwrap();
        for name in ["graph_1.png", "graph_2.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"cached").unwrap();
        }

        let report = cleaner_for(dir.path()).clear().await.unwrap();

        assert_eq!(report, CleanupReport { removed: 3, skipped: 0 });
        assert!(dir.path().exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_clear_empty_directory() {
        let dir = tempdir().unwrap();
        let report = cleaner_for(dir.path()).clear().await.unwrap();
        assert_eq!(report, CleanupReport::default());
    }

    #[tokio::test]
    async fn test_missing_directory_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("images");

        let err = cleaner_for(&missing).clear().await.unwrap_err();
        assert!(matches!(err, LauncherError::CacheList { .. }));
    }

    #[tokio::test]
    async fn test_subdirectory_entry_aborts() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let err = cleaner_for(dir.path()).clear().await.unwrap_err();
        match err {
            LauncherError::CacheDelete { path, .. } => assert!(path.ends_with("nested")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_policy_continues_past_failures() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("graph.png"), b"cached").unwrap();

        let cleaner = CacheCleaner::new(CacheConfig {
            directory: dir.path().to_path_buf(),
            on_permission_denied: FailureAction::Skip,
            on_other: FailureAction::Skip,
            ..Default::default()
        });
        let report = cleaner.clear().await.unwrap();

        assert_eq!(report, CleanupReport { removed: 1, skipped: 1 });
        assert!(!dir.path().join("graph.png").exists());
        assert!(dir.path().join("nested").exists());
    }
}
