// launcher/src/launcher.rs
//
// Wires cache cleanup, the server process and the window together.

use crate::cache::{CacheCleaner, CleanupReport};
use crate::client;
use crate::config::Config;
use crate::error::LauncherError;
use crate::supervisor::{spawn_server, ExitOutcome, ServerHandle, ServerOutput};
use crate::window::{WindowHost, WindowSpec};
use std::sync::Mutex;
use tokio::task::JoinHandle;

/// Owns the cleanup task and the server process for the launcher's lifetime
///
/// Lifecycle: `start` at process start, `open_window` once the UI host is
/// ready, `stop` when the window goes away.
pub struct Launcher {
    config: Config,
    cleanup: Mutex<Option<JoinHandle<Result<CleanupReport, LauncherError>>>>,
    server: Option<ServerHandle>,
}

impl Launcher {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cleanup: Mutex::new(None),
            server: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn server(&self) -> Option<&ServerHandle> {
        self.server.as_ref()
    }

    /// Begin cache cleanup, then spawn the server without waiting for cleanup
    pub fn start(&mut self) -> Result<(), LauncherError> {
        self.start_with_output(ServerOutput::inherit())
    }

    pub fn start_with_output(&mut self, output: ServerOutput) -> Result<(), LauncherError> {
        if self.config.cache.clear_on_start {
            let cleaner = CacheCleaner::new(self.config.cache.clone());
            tracing::info!("Clearing cache directory {}", cleaner.directory().display());
            let handle = tokio::spawn(async move { cleaner.clear().await });
            if let Ok(mut slot) = self.cleanup.lock() {
                *slot = Some(handle);
            }
        }

        let server = spawn_server(
            &self.config.server,
            self.config.readiness.watched_line(),
            output,
        )?;
        self.server = Some(server);
        Ok(())
    }

    /// Create the window and point it at the server once it is ready
    ///
    /// Called on the host's readiness signal. Returns the loaded URL. A failed
    /// cleanup or window creation stops the server and is returned. A failed
    /// readiness probe shows the error page instead of loading and is
    /// returned; the window stays up.
    pub async fn open_window<W>(&self, window: &W) -> Result<String, LauncherError>
    where
        W: WindowHost + ?Sized,
    {
        let spec = WindowSpec::from(&self.config.window);
        if let Err(err) = window.create(&spec) {
            // Without a window nothing can ever stop the server
            tracing::error!("Failed to create window: {}", err);
            let _ = self.shutdown().await;
            let reason = match err {
                LauncherError::Window(reason) => reason,
                other => other.to_string(),
            };
            return Err(LauncherError::WindowCreate(reason));
        }

        let probe = self.config.readiness.probe(&self.config.server);
        let readiness = async { Ok::<_, LauncherError>(probe.wait(self.server.as_ref()).await) };

        // A cleanup failure ends the wait early; a readiness failure does not
        let readiness = match tokio::try_join!(self.finish_cleanup(), readiness) {
            Ok((_, readiness)) => readiness,
            Err(err) => {
                tracing::error!("Cache cleanup failed: {}", err);
                self.stop().await;
                return Err(err);
            }
        };

        let url = self.config.server.url();
        match readiness {
            Ok(()) => {
                tracing::info!("Loading URL: {}", url);
                window.load_url(&url)?;
                Ok(url)
            }
            Err(err) => {
                tracing::error!("Server did not become ready: {}", err);
                window.show_error(&err.to_string())?;
                Err(err)
            }
        }
    }

    /// Join the cleanup task; only the first caller waits on it
    async fn finish_cleanup(&self) -> Result<Option<CleanupReport>, LauncherError> {
        let handle = self.cleanup.lock().ok().and_then(|mut slot| slot.take());
        let Some(handle) = handle else {
            return Ok(None);
        };
        match handle.await {
            Ok(result) => result.map(Some),
            Err(e) => Err(LauncherError::TaskFailed(e.to_string())),
        }
    }

    /// Stop the server and join the cleanup task
    ///
    /// For paths that give up before `open_window` could join cleanup. A
    /// cleanup failure is logged and returned.
    pub async fn shutdown(&self) -> Result<Option<CleanupReport>, LauncherError> {
        if let Some(outcome) = self.stop().await {
            tracing::info!("Server stopped with {}", outcome);
        }
        let cleanup = self.finish_cleanup().await;
        if let Err(err) = &cleanup {
            tracing::error!("Cache cleanup failed: {}", err);
        }
        cleanup
    }

    /// Script to inject into the window, if client scripts are enabled
    pub fn client_script(&self) -> Option<String> {
        self.config.client.enabled.then(client::init_script)
    }

    /// Kill the server if it is still running
    pub async fn stop(&self) -> Option<ExitOutcome> {
        match &self.server {
            Some(server) => Some(server.stop().await),
            None => None,
        }
    }

    /// Resolves when the server exits; the window is left as it is
    pub async fn wait_server_exit(&self) -> Result<ExitOutcome, LauncherError> {
        let server = self.server.as_ref().ok_or(LauncherError::NotStarted)?;
        Ok(server.wait_exit().await)
    }
}
