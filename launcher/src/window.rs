// launcher/src/window.rs
//
// The desktop window the server is shown in, abstracted over the UI toolkit.

use crate::config::WindowConfig;
use crate::error::LauncherError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl From<&WindowConfig> for WindowSpec {
    fn from(config: &WindowConfig) -> Self {
        Self {
            title: config.title.clone(),
            width: config.width,
            height: config.height,
        }
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self::from(&WindowConfig::default())
    }
}

/// A host able to show one window pointed at the server
///
/// The launcher creates the window once and never closes it.
pub trait WindowHost {
    fn create(&self, spec: &WindowSpec) -> Result<(), LauncherError>;

    fn load_url(&self, url: &str) -> Result<(), LauncherError>;

    /// Replace the window content with a startup error page
    fn show_error(&self, message: &str) -> Result<(), LauncherError>;
}

/// Window host for running without a UI; every call is only logged
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessWindow;

impl WindowHost for HeadlessWindow {
    fn create(&self, spec: &WindowSpec) -> Result<(), LauncherError> {
        tracing::info!(
            "Headless mode: window '{}' ({}x{}) not shown",
            spec.title,
            spec.width,
            spec.height
        );
        Ok(())
    }

    fn load_url(&self, url: &str) -> Result<(), LauncherError> {
        tracing::info!("Server available at {}", url);
        Ok(())
    }

    fn show_error(&self, message: &str) -> Result<(), LauncherError> {
        tracing::error!("Startup error: {}", message);
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Standalone HTML page describing a startup failure
pub fn error_page(message: &str, build_info: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <style>
        body {{
            margin: 0;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            background: #f5f5f5;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        }}
        .error-container {{
            background: white;
            padding: 40px;
            border-radius: 12px;
            box-shadow: 0 4px 20px rgba(0,0,0,0.1);
            max-width: 500px;
            text-align: center;
        }}
        h1 {{
            color: #e53e3e;
            font-size: 24px;
        }}
        p {{
            color: #4a5568;
            line-height: 1.6;
            white-space: pre-wrap;
        }}
        .build {{
            margin-top: 30px;
            font-size: 12px;
            color: #a0aec0;
        }}
    </style>
</head>
<body>
    <div class="error-container">
        <h1>Startup error</h1>
        <p>{}</p>
        <div class="build">Build: {}</div>
    </div>
</body>
</html>
"#,
        escape_html(message),
        escape_html(build_info)
    )
}

/// The error page as a self-contained `data:` URL
///
/// Navigating to it replaces whatever the window was loading, so the page
/// cannot be overwritten by a navigation still in flight.
pub fn error_page_url(message: &str, build_info: &str) -> String {
    format!(
        "data:text/html;charset=utf-8;base64,{}",
        BASE64.encode(error_page(message, build_info))
    )
}
