//! Surface page generation
//!
//! Builds the HTML document loaded into the webview: the editing engine,
//! the IPC bridge and the (sanitized) user style text.

use crate::config::SurfaceConfig;
use crate::messages::ThemeHint;
use crate::sanitize::sanitize_css;

/// Editing engine distribution
const ENGINE_CDN: &str = "https://cdn.jsdelivr.net/npm/vditor@3.10.4/dist";

const BRIDGE_JS: &str = include_str!("bridge.js");

/// Base layout for the surface and the plain source editor
const BASE_CSS: &str = r#"
html, body { margin: 0; padding: 0; height: 100%; }
#app { height: 100vh; }
.md-surface-plain {
    width: 100%;
    height: 100%;
    box-sizing: border-box;
    border: none;
    outline: none;
    resize: none;
    padding: 16px 32px;
    font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace;
    font-size: 14px;
    line-height: 1.6;
    background: inherit;
    color: inherit;
}
"#;

/// Colors applied when the surface follows the host theme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacePalette {
    pub background: &'static str,
    pub text: &'static str,
    pub border: &'static str,
    pub accent: &'static str,
}

impl SurfacePalette {
    pub fn for_theme(theme: ThemeHint) -> Self {
        match theme {
            ThemeHint::Dark => Self {
                background: "#1e1e1e",
                text: "#d4d4d4",
                border: "#3c3c3c",
                accent: "#569cd6",
            },
            ThemeHint::Light => Self {
                background: "#ffffff",
                text: "#24292e",
                border: "#e1e4e8",
                accent: "#0366d6",
            },
        }
    }

    fn css(&self) -> String {
        format!(
            r#"
:root {{
    --panel-background-color: {background};
    --textarea-background-color: {background};
    --toolbar-background-color: {background};
    --border-color: {border};
    --second-color: {text};
    --ir-heading-color: {accent};
}}
body, .vditor-reset {{
    background: {background};
    color: {text};
}}
"#,
            background = self.background,
            text = self.text,
            border = self.border,
            accent = self.accent,
        )
    }
}

/// Generate the complete surface page for a configuration
pub fn surface_html(config: &SurfaceConfig) -> String {
    let theme_css = if config.use_theme_color {
        SurfacePalette::for_theme(config.theme).css()
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <link rel="stylesheet" href="{cdn}/index.css">
    <style>{base}{theme}</style>
    <style>{custom}</style>
</head>
<body class="md-surface-{theme_name}">
    <div id="app"></div>
    <script src="{cdn}/index.min.js"></script>
    <script>{bridge}</script>
</body>
</html>"#,
        cdn = ENGINE_CDN,
        base = BASE_CSS,
        theme = theme_css,
        custom = sanitize_css(&config.custom_css),
        theme_name = match config.theme {
            ThemeHint::Dark => "dark",
            ThemeHint::Light => "light",
        },
        bridge = BRIDGE_JS,
    )
}
