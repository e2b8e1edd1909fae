use anyhow::Result;
use calcdesk_launcher::bootstrap;
use calcdesk_launcher::launcher::Launcher;
use calcdesk_launcher::window::HeadlessWindow;

#[tokio::main]
async fn main() -> Result<()> {
    let app = bootstrap::setup();
    let mut launcher = Launcher::new(app.config);

    launcher.start()?;

    // No UI to wait on: the runtime is ready as soon as the server is spawned
    if let Err(e) = launcher.open_window(&HeadlessWindow).await {
        if e.is_fatal() {
            return Err(e.into());
        }
    }

    tokio::select! {
        outcome = launcher.wait_server_exit() => {
            let outcome = outcome?;
            let uptime = launcher.server().map(|s| s.uptime().num_seconds()).unwrap_or_default();
            tracing::info!("Server finished with {} after {}s; launcher exiting", outcome, uptime);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping server...");
            launcher.stop().await;
        }
    }

    Ok(())
}
