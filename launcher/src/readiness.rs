// launcher/src/readiness.rs
//
// Decides when the server can be shown in the window.

use crate::error::LauncherError;
use crate::supervisor::ServerHandle;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessProbe {
    /// Sleep, then report ready whatever the server is doing
    FixedDelay(Duration),
    /// Poll until the server accepts a TCP connection
    TcpPort {
        address: String,
        interval: Duration,
        timeout: Duration,
    },
    /// Wait for the supervisor to see the configured line on stdout
    OutputLine { timeout: Duration },
}

impl ReadinessProbe {
    /// Wait until the server counts as ready
    ///
    /// `FixedDelay` never fails. The other probes fail when the server exits
    /// first or when their timeout elapses.
    pub async fn wait(&self, server: Option<&ServerHandle>) -> Result<(), LauncherError> {
        match self {
            Self::FixedDelay(delay) => {
                tracing::debug!("Waiting {:?} before loading the server URL", delay);
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            Self::TcpPort {
                address,
                interval,
                timeout,
            } => {
                tracing::info!("Waiting for server to accept connections on {}...", address);
                race_exit(poll_port(address, *interval), server, *timeout).await
            }
            Self::OutputLine { timeout } => {
                let server = server.ok_or(LauncherError::NotStarted)?;
                tracing::info!("Waiting for server ready line...");
                let seen = async {
                    if !server.ready_line_seen().await {
                        // stdout closed without the line; only exit or timeout can end this
                        std::future::pending::<()>().await;
                    }
                };
                race_exit(seen, Some(server), *timeout).await
            }
        }
    }
}

async fn poll_port(address: &str, interval: Duration) {
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        if TcpStream::connect(address).await.is_ok() {
            tracing::info!("Server ready on {} after {} attempts", address, attempts);
            return;
        }
        if attempts % 20 == 0 {
            tracing::debug!("Still waiting for {} ({} attempts)", address, attempts);
        }
        tokio::time::sleep(interval).await;
    }
}

async fn race_exit<F>(
    ready: F,
    server: Option<&ServerHandle>,
    timeout: Duration,
) -> Result<(), LauncherError>
where
    F: Future<Output = ()>,
{
    let exited = async {
        match server {
            Some(server) => server.wait_exit().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = ready => Ok(()),
        outcome = exited => Err(LauncherError::ServerExitedEarly(outcome.to_string())),
        _ = tokio::time::sleep(timeout) => Err(LauncherError::ReadinessTimeout(timeout)),
    }
}
