// launcher/src/client.rs
//
// Browser-side helpers injected into the window: the image dimension reporter
// and the form field relays.

pub const HEIGHT_COOKIE: &str = "height";
pub const WIDTH_COOKIE: &str = "width";

/// Render a Rust string as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Script that mirrors the first image's rendered size into cookies
///
/// Runs once the document is parsed and again on every resize. When the page
/// has no image the handler throws and the cookies are left untouched.
pub fn dimension_reporter_script() -> String {
    format!(
        r#"(function () {{
    function set_height_width_cookies() {{
        var image = document.getElementsByTagName("img")[0];
        var height = image.clientHeight;
        var width = image.clientWidth;
        document.cookie = {height} + "=" + height;
        document.cookie = {width} + "=" + width;
    }}
    window.set_height_width_cookies = set_height_width_cookies;
    if (document.readyState === "loading") {{
        document.addEventListener("DOMContentLoaded", set_height_width_cookies);
    }} else {{
        set_height_width_cookies();
    }}
    window.addEventListener("resize", function () {{
        set_height_width_cookies();
    }});
}})();
"#,
        height = js_string(HEIGHT_COOKIE),
        width = js_string(WIDTH_COOKIE),
    )
}

/// Copies named form inputs into their mirror inputs before a submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRelay {
    /// Global function name the page's inline handlers call
    pub name: String,
    /// (source field, destination field)
    pub pairs: Vec<(String, String)>,
}

impl FieldRelay {
    pub fn new(name: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            pairs: pairs
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    /// `raw_text` into `content`
    pub fn save_graph() -> Self {
        Self::new("save_graph", &[("raw_text", "content")])
    }

    /// `filename`/`description` into `filename2`/`description2`
    pub fn graph() -> Self {
        Self::new(
            "graph",
            &[("filename", "filename2"), ("description", "description2")],
        )
    }

    pub fn script(&self) -> String {
        let mut body = String::new();
        for (from, to) in &self.pairs {
            body.push_str(&format!(
                "    document.getElementsByName({})[0].value = document.getElementsByName({})[0].value;\n",
                js_string(to),
                js_string(from)
            ));
        }
        format!("window[{}] = function () {{\n{}}};\n", js_string(&self.name), body)
    }
}

/// Everything injected into the window before the page's own scripts run
///
/// The relays come first so a reporter that throws on an image-less page
/// cannot keep them from being defined.
pub fn init_script() -> String {
    let mut script = String::new();
    for relay in [FieldRelay::save_graph(), FieldRelay::graph()] {
        script.push_str(&relay.script());
    }
    script.push_str(&dimension_reporter_script());
    script
}
