// CalcDesk Desktop Application
// Tauri shell that clears the image cache, starts the calculator server
// and shows it in a native window

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use calcdesk_launcher::bootstrap::{self, Application};
use calcdesk_launcher::error::LauncherError;
use calcdesk_launcher::launcher::Launcher;
use calcdesk_launcher::window::{error_page_url, WindowHost, WindowSpec};
use std::sync::Arc;
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder, WindowEvent};

const MAIN_WINDOW: &str = "main";

/// Window host backed by a Tauri webview window
struct TauriWindow {
    app: AppHandle,
    init_script: Option<String>,
}

impl TauriWindow {
    fn main_window(&self) -> Result<WebviewWindow, LauncherError> {
        self.app
            .get_webview_window(MAIN_WINDOW)
            .ok_or_else(|| LauncherError::Window("main window has not been created".to_string()))
    }
}

fn window_err(e: tauri::Error) -> LauncherError {
    LauncherError::Window(e.to_string())
}

impl WindowHost for TauriWindow {
    fn create(&self, spec: &WindowSpec) -> Result<(), LauncherError> {
        let mut builder =
            WebviewWindowBuilder::new(&self.app, MAIN_WINDOW, WebviewUrl::App("index.html".into()))
                .title(format!("{} v{}", spec.title, env!("PACKAGE_VERSION")))
                .inner_size(f64::from(spec.width), f64::from(spec.height));

        if let Some(script) = &self.init_script {
            builder = builder.initialization_script(script);
        }

        builder.build().map_err(window_err)?;
        Ok(())
    }

    fn load_url(&self, url: &str) -> Result<(), LauncherError> {
        let parsed = tauri::Url::parse(url)
            .map_err(|e| LauncherError::Window(format!("Invalid URL {}: {}", url, e)))?;
        self.main_window()?.navigate(parsed).map_err(window_err)
    }

    fn show_error(&self, message: &str) -> Result<(), LauncherError> {
        let window = self.main_window()?;
        let _ = window.set_title(&format!("CalcDesk v{} - Error", env!("PACKAGE_VERSION")));

        // Supersedes the initial index.html load if it is still in flight
        self.load_url(&error_page_url(message, env!("BUILD_INFO")))?;
        let _ = window.show();
        let _ = window.set_focus();
        Ok(())
    }
}

fn main() {
    let Application { config, log_guard: _log_guard } = bootstrap::setup();
    tracing::info!("Desktop Version: {}", env!("BUILD_INFO"));

    // Cleanup and server spawn start with the process, before any UI exists
    let mut launcher = Launcher::new(config);
    let started = tauri::async_runtime::block_on(async { launcher.start() });
    let launcher = Arc::new(launcher);
    let window_launcher = launcher.clone();

    tauri::Builder::default()
        .setup(move |app| {
            let window = TauriWindow {
                app: app.handle().clone(),
                init_script: launcher.client_script(),
            };

            if let Err(e) = started {
                tracing::error!("Failed to start server: {}", e);
                window.create(&WindowSpec::from(&launcher.config().window))?;
                window.show_error(&e.to_string())?;
                // Cleanup may still be running; its outcome is only logged
                tauri::async_runtime::spawn(async move {
                    let _ = launcher.shutdown().await;
                });
                return Ok(());
            }

            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                if let Err(e) = launcher.open_window(&window).await {
                    if e.is_fatal() {
                        tracing::error!("Fatal launcher error: {}", e);
                        handle.exit(1);
                    }
                }
            });

            Ok(())
        })
        .on_window_event(move |window, event| {
            if let WindowEvent::CloseRequested { .. } = event {
                if window.label() == MAIN_WINDOW {
                    let launcher = window_launcher.clone();
                    tauri::async_runtime::block_on(async move {
                        if let Some(outcome) = launcher.stop().await {
                            tracing::info!("Server stopped with {}", outcome);
                        }
                    });
                }
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
